//! Form error collection shared by every HTML form

use serde::Serialize;
use std::collections::BTreeMap;
use validator::ValidationErrors;

/// Errors keyed by field name, plus errors that belong to the form as a whole
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub non_field: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add_non_field(message);
        errors
    }

    /// Fold derive-generated validation failures into this collection
    pub fn extend_validation(&mut self, errors: ValidationErrors) {
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", error.code));
                self.add(&field.to_string(), message);
            }
        }
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Self::default();
        out.extend_validation(errors);
        out
    }
}
