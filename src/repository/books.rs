//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookInput},
};

const BOOK_COLUMNS: &str = r#"
    b.id, b.title, b.author_id, a.name AS author_name, b.publication_year
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All books, ordered by title
    pub async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {}
            FROM books b
            JOIN authors a ON a.id = b.author_id
            ORDER BY LOWER(b.title), b.id
            "#,
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {}
            FROM books b
            JOIN authors a ON a.id = b.author_id
            WHERE b.id = $1
            "#,
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Books held by a library
    pub async fn list_for_library(&self, library_id: i32) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {}
            FROM library_books lb
            JOIN books b ON b.id = lb.book_id
            JOIN authors a ON a.id = b.author_id
            WHERE lb.library_id = $1
            ORDER BY LOWER(b.title), b.id
            "#,
            BOOK_COLUMNS
        ))
        .bind(library_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Create a new book
    pub async fn create(&self, input: &BookInput) -> AppResult<Book> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, author_id, publication_year)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&input.title)
        .bind(input.author_id)
        .bind(input.publication_year)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Update an existing book
    pub async fn update(&self, id: i32, input: &BookInput) -> AppResult<Book> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $1, author_id = $2, publication_year = $3
            WHERE id = $4
            "#,
        )
        .bind(&input.title)
        .bind(input.author_id)
        .bind(input.publication_year)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        self.get_by_id(id).await
    }

    /// Delete a book (library memberships go with it)
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }
}
