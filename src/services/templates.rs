//! HTML page rendering with handlebars

use axum::response::Html;
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::user::SessionClaims,
};

/// (name, source) of every template, embedded at compile time
const TEMPLATES: &[(&str, &str)] = &[
    ("layout", include_str!("../../templates/layout.hbs")),
    ("form_errors", include_str!("../../templates/form_errors.hbs")),
    ("book_fields", include_str!("../../templates/book_fields.hbs")),
    ("home", include_str!("../../templates/home.hbs")),
    ("list_books", include_str!("../../templates/list_books.hbs")),
    ("library_detail", include_str!("../../templates/library_detail.hbs")),
    ("register", include_str!("../../templates/register.hbs")),
    ("login", include_str!("../../templates/login.hbs")),
    ("logout", include_str!("../../templates/logout.hbs")),
    ("profile", include_str!("../../templates/profile.hbs")),
    ("admin_view", include_str!("../../templates/admin_view.hbs")),
    ("admin_catalog", include_str!("../../templates/admin_catalog.hbs")),
    ("librarian_view", include_str!("../../templates/librarian_view.hbs")),
    ("member_view", include_str!("../../templates/member_view.hbs")),
    ("add_book", include_str!("../../templates/add_book.hbs")),
    ("edit_book", include_str!("../../templates/edit_book.hbs")),
    ("delete_book", include_str!("../../templates/delete_book.hbs")),
];

#[derive(Clone)]
pub struct Templates {
    registry: Arc<Handlebars<'static>>,
}

impl Templates {
    /// Register every page and partial
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();
        for (name, source) in TEMPLATES {
            registry
                .register_template_string(name, source)
                .map_err(|e| AppError::Internal(format!("Template {} failed to parse: {}", name, e)))?;
        }

        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    /// Render a page inside the layout.
    ///
    /// `data` must serialize to a JSON object; `title` and `user` are added to it.
    pub fn render<T: Serialize>(
        &self,
        name: &str,
        title: &str,
        user: Option<&SessionClaims>,
        data: &T,
    ) -> AppResult<Html<String>> {
        let mut context = match serde_json::to_value(data)
            .map_err(|e| AppError::Internal(format!("Failed to serialize template data: {}", e)))?
        {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(AppError::Internal(format!(
                    "Template data for {} must be an object, got {}",
                    name, other
                )))
            }
        };

        context.insert("title".to_string(), json!(title));
        context.insert(
            "user".to_string(),
            user.map(|c| json!({ "id": c.user_id, "username": c.sub, "role": c.role }))
                .unwrap_or(Value::Null),
        );

        let body = self.registry.render(name, &Value::Object(context))?;
        Ok(Html(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use std::collections::BTreeSet;

    fn member() -> SessionClaims {
        SessionClaims {
            sub: "ada".to_string(),
            user_id: 3,
            role: Role::Member,
            permissions: BTreeSet::new(),
            jti: "j".to_string(),
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn all_templates_parse() {
        let templates = Templates::new().unwrap();
        for (name, _) in TEMPLATES {
            assert!(templates.registry.has_template(name), "{}", name);
        }
    }

    #[test]
    fn list_books_escapes_titles() {
        let templates = Templates::new().unwrap();
        let Html(body) = templates
            .render(
                "list_books",
                "Books",
                None,
                &json!({ "books": [{
                    "id": 1,
                    "title": "<b>Bold</b>",
                    "author_id": 1,
                    "author_name": "Anon",
                    "publication_year": null
                }] }),
            )
            .unwrap();

        assert!(body.contains("&lt;b&gt;Bold&lt;/b&gt;"));
        assert!(body.contains("Anon"));
        assert!(body.contains("<title>Books"));
    }

    #[test]
    fn layout_shows_current_user() {
        let templates = Templates::new().unwrap();
        let Html(body) = templates
            .render("member_view", "Member", Some(&member()), &json!({}))
            .unwrap();
        assert!(body.contains("ada"));
        assert!(body.contains("/logout"));

        let Html(anonymous) = templates.render("home", "Home", None, &()).unwrap();
        assert!(anonymous.contains("/login"));
    }

    #[test]
    fn non_object_data_is_rejected() {
        let templates = Templates::new().unwrap();
        assert!(templates.render("home", "Home", None, &42).is_err());
    }
}
