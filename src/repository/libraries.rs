//! Libraries repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::library::{Librarian, Library, LibraryInput, LibrarySummary},
};

#[derive(Clone)]
pub struct LibrariesRepository {
    pool: Pool<Postgres>,
}

impl LibrariesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get library by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Library> {
        sqlx::query_as::<_, Library>("SELECT id, name FROM libraries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Library with id {} not found", id)))
    }

    /// Librarian assigned to a library, if any
    pub async fn get_librarian(&self, library_id: i32) -> AppResult<Option<Librarian>> {
        let librarian = sqlx::query_as::<_, Librarian>(
            "SELECT id, name, library_id FROM librarians WHERE library_id = $1",
        )
        .bind(library_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(librarian)
    }

    /// Every library with its librarian's name and holdings count
    pub async fn list(&self) -> AppResult<Vec<LibrarySummary>> {
        let libraries = sqlx::query_as::<_, LibrarySummary>(
            r#"
            SELECT l.id, l.name, lr.name AS librarian_name,
                   (SELECT COUNT(*) FROM library_books lb WHERE lb.library_id = l.id) AS book_count
            FROM libraries l
            LEFT JOIN librarians lr ON lr.library_id = l.id
            ORDER BY l.name, l.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(libraries)
    }

    /// Create a library and, when named, its librarian
    pub async fn create(&self, input: &LibraryInput) -> AppResult<Library> {
        let mut tx = self.pool.begin().await?;

        let library = sqlx::query_as::<_, Library>(
            "INSERT INTO libraries (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&input.name)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(librarian) = &input.librarian {
            sqlx::query("INSERT INTO librarians (name, library_id) VALUES ($1, $2)")
                .bind(librarian)
                .bind(library.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(library)
    }

    /// Add a book to a library's holdings; adding it twice is a no-op
    pub async fn add_book(&self, library_id: i32, book_id: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO library_books (library_id, book_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(library_id)
        .bind(book_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
