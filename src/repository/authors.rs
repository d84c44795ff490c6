//! Authors repository

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::author::Author};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All authors, for the book form's author choice
    pub async fn list(&self) -> AppResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>("SELECT id, name FROM authors ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;

        Ok(authors)
    }

    pub async fn create(&self, name: &str) -> AppResult<Author> {
        let author = sqlx::query_as::<_, Author>(
            "INSERT INTO authors (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(author)
    }
}
