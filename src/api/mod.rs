//! HTTP handlers, request extractors and access gates

pub mod auth;
pub mod books;
pub mod health;
pub mod home;
pub mod libraries;
pub mod management;
pub mod roles;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::{request::Parts, Uri},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::{
    error::AppError,
    models::user::{Role, SessionClaims},
    AppState,
};

/// Session of the requester, if any
pub struct CurrentUser(pub Option<SessionClaims>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let sessions = &state.services.sessions;
        let jar = CookieJar::from_headers(&parts.headers);

        let claims = match jar.get(sessions.cookie_name()) {
            Some(cookie) => sessions.decode(cookie.value()).await,
            None => None,
        };

        match claims {
            Some(claims) => Ok(CurrentUser(
                state.services.users.refresh_session(claims).await?,
            )),
            None => Ok(CurrentUser(None)),
        }
    }
}

/// Logged-in requester; anonymous requests are sent to the login page
pub struct AuthenticatedUser(pub SessionClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await? {
            CurrentUser(Some(claims)) => Ok(AuthenticatedUser(claims)),
            CurrentUser(None) => Err(AppError::Redirect(redirect_with_next(
                "/login",
                &full_path(&parts.uri),
            ))),
        }
    }
}

/// Integer id segment of the route; anything else is a missing page
pub struct PathId(pub i32);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PathId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i32>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(PathId(id)),
            Err(rejection) => {
                tracing::debug!(path = %parts.uri.path(), "Unmatched id: {}", rejection.body_text());
                Err(AppError::NotFound(format!("No page at {}", parts.uri.path())))
            }
        }
    }
}

/// Role gate: a user with another role is sent to the home page
pub fn require_role(claims: &SessionClaims, role: Role, uri: &Uri) -> Result<(), AppError> {
    if claims.has_role(role) {
        Ok(())
    } else {
        Err(AppError::Redirect(redirect_with_next("/", &full_path(uri))))
    }
}

fn full_path(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

/// `target?next=<path>` with the path percent-encoded
pub fn redirect_with_next(target: &str, next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{}?next={}", target, encoded)
}

/// Only same-site absolute paths may be used as a post-login destination
pub fn is_safe_redirect(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && !next.chars().any(|c| c.is_control())
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::home))
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::list_books))
        .route("/books/add", get(books::add_book_form).post(books::add_book))
        .route("/books/:id/edit", get(books::edit_book_form).post(books::edit_book))
        .route("/books/:id/delete", get(books::delete_book_confirm).post(books::delete_book))
        .route("/libraries/:id", get(libraries::library_detail))
        // Accounts
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout).post(auth::logout))
        .route("/profile", get(auth::profile))
        // Role landing pages
        .route("/admin", get(roles::admin_view))
        .route("/admin/users/:id/role", post(roles::update_role))
        .route("/admin/users/:id/permissions", post(roles::update_permission))
        .route("/admin/catalog", get(management::catalog_view))
        .route("/admin/authors", post(management::create_author))
        .route("/admin/libraries", post(management::create_library))
        .route("/admin/libraries/:id/books", post(management::add_library_book))
        .route("/librarian", get(roles::librarian_view))
        .route("/member", get(roles::member_view))
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
