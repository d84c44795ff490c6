//! Error types for Shelfmark

use axum::{
    http::{header::LOCATION, StatusCode},
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// Not a failure: the request must continue at another location
    #[error("Redirect to {0}")]
    Redirect(String),
}

impl AppError {
    /// Status code this error is rendered with
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Redirect(_) => StatusCode::SEE_OTHER,
            AppError::Database(_) | AppError::Template(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            AppError::Redirect(location) => {
                return (status, [(LOCATION, location.clone())]).into_response();
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Template(e) => {
                tracing::error!("Template error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg) => msg.clone(),
        };

        let title = format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        );
        let body = format!(
            "<!DOCTYPE html>\n<html><head><title>{title}</title></head>\
             <body><h1>{title}</h1><p>{}</p></body></html>\n",
            handlebars::html_escape(&message),
        );

        (status, Html(body)).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_carries_location() {
        let response = AppError::Redirect("/login?next=%2Fprofile".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/login?next=%2Fprofile"
        );
    }

    #[test]
    fn access_errors_map_to_http_status() {
        assert_eq!(
            AppError::Authorization("no".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn error_page_escapes_message() {
        let response = AppError::NotFound("<script>".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("404 Not Found"));
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }
}
