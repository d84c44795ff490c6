//! Library and librarian models, and the admin library forms

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{author::clean_name, book::Book, form::FormErrors};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Library {
    pub id: i32,
    pub name: String,
}

/// Staff member in charge of a library (one per library)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Librarian {
    pub id: i32,
    pub name: String,
    pub library_id: i32,
}

/// Library with its related rows, as shown on the detail page
#[derive(Debug, Clone, Serialize)]
pub struct LibraryDetail {
    pub library: Library,
    pub books: Vec<Book>,
    pub librarian: Option<Librarian>,
}

/// Row of the admin catalog page
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LibrarySummary {
    pub id: i32,
    pub name: String,
    pub librarian_name: Option<String>,
    pub book_count: i64,
}

/// New library, optionally with its librarian
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub librarian: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryInput {
    pub name: String,
    pub librarian: Option<String>,
}

impl LibraryForm {
    pub fn clean(&self) -> Result<LibraryInput, FormErrors> {
        let mut errors = FormErrors::default();
        let name = clean_name(&self.name, "name", &mut errors);
        let librarian = if self.librarian.trim().is_empty() {
            None
        } else {
            Some(clean_name(&self.librarian, "librarian", &mut errors))
        };

        errors
            .into_result()
            .map(|_| LibraryInput { name, librarian })
    }
}

/// Book to add to a library's holdings
#[derive(Debug, Deserialize)]
pub struct LibraryBookForm {
    #[serde(default)]
    pub book: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn librarian_is_optional() {
        let form = LibraryForm {
            name: " Hillside ".to_string(),
            librarian: "  ".to_string(),
        };
        assert_eq!(
            form.clean().unwrap(),
            LibraryInput { name: "Hillside".to_string(), librarian: None }
        );

        let staffed = LibraryForm {
            name: "Hillside".to_string(),
            librarian: "Amara".to_string(),
        };
        assert_eq!(staffed.clean().unwrap().librarian.as_deref(), Some("Amara"));
    }

    #[test]
    fn library_name_is_required() {
        let errors = LibraryForm::default().clean().unwrap_err();
        assert!(errors.fields.contains_key("name"));
        assert!(!errors.fields.contains_key("librarian"));
    }
}
