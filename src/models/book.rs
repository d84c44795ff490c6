//! Book model and the add/edit form

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{author::Author, form::FormErrors};

/// Book row joined with its author's name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub author_name: String,
    pub publication_year: Option<i32>,
}

/// Cleaned book data ready to be written
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct BookInput {
    #[validate(length(max = 200, message = "Ensure this value has at most 200 characters."))]
    pub title: String,
    pub author_id: i32,
    #[validate(range(min = 0, max = 9999, message = "Enter a year between 0 and 9999."))]
    pub publication_year: Option<i32>,
}

/// Raw form fields as submitted by the browser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub publication_year: String,
}

impl BookForm {
    /// Pre-fill the form from an existing book
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author_id.to_string(),
            publication_year: book
                .publication_year
                .map(|y| y.to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate against the selectable authors
    pub fn clean(&self, authors: &[Author]) -> Result<BookInput, FormErrors> {
        let mut errors = FormErrors::default();

        let title = self.title.trim().to_string();
        if title.is_empty() {
            errors.add("title", "This field is required.");
        }

        let author = self.author.trim();
        let author_id = if author.is_empty() {
            errors.add("author", "This field is required.");
            None
        } else {
            match author.parse::<i32>() {
                Ok(id) if authors.iter().any(|a| a.id == id) => Some(id),
                _ => {
                    errors.add(
                        "author",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                    None
                }
            }
        };

        let year = self.publication_year.trim();
        let publication_year = if year.is_empty() {
            None
        } else {
            match year.parse::<i32>() {
                Ok(y) => Some(y),
                Err(_) => {
                    errors.add("publication_year", "Enter a whole number.");
                    None
                }
            }
        };

        let input = BookInput {
            title,
            author_id: author_id.unwrap_or_default(),
            publication_year,
        };
        if let Err(e) = input.validate() {
            errors.extend_validation(e);
        }

        errors.into_result().map(|_| input)
    }
}
