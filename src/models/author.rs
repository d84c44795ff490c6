//! Author model and the admin author form

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::form::FormErrors;

pub const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Author {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorForm {
    #[serde(default)]
    pub name: String,
}

impl AuthorForm {
    /// Trimmed name, or the field errors
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        let name = clean_name(&self.name, "name", &mut errors);
        errors.into_result().map(|_| name)
    }
}

/// Required short name shared by the author, library and librarian fields
pub(crate) fn clean_name(raw: &str, field: &str, errors: &mut FormErrors) -> String {
    let name = raw.trim().to_string();
    if name.is_empty() {
        errors.add(field, "This field is required.");
    } else if name.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                MAX_NAME_LENGTH,
                name.chars().count()
            ),
        );
    }
    name
}
