//! Admin pages for authors, libraries, librarians and library holdings

use axum::{
    extract::State,
    http::Uri,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::AuthorForm,
        form::FormErrors,
        library::{LibraryBookForm, LibraryForm},
        user::{Role, SessionClaims},
    },
    AppState,
};

use super::{require_role, AuthenticatedUser, PathId};

/// Submitted values and errors of the two create forms
#[derive(Default)]
struct Forms {
    author: AuthorForm,
    author_errors: FormErrors,
    library: LibraryForm,
    library_errors: FormErrors,
}

async fn render_catalog(
    state: &AppState,
    claims: &SessionClaims,
    forms: Forms,
) -> AppResult<Html<String>> {
    let catalog = &state.services.catalog;
    let authors = catalog.list_authors().await?;
    let libraries = catalog.list_libraries().await?;
    let books = catalog.list_books().await?;

    state.services.templates.render(
        "admin_catalog",
        "Catalog",
        Some(claims),
        &json!({
            "authors": authors,
            "libraries": libraries,
            "books": books,
            "author_form": forms.author,
            "author_errors": forms.author_errors,
            "library_form": forms.library,
            "library_errors": forms.library_errors,
        }),
    )
}

pub async fn catalog_view(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    uri: Uri,
) -> AppResult<Html<String>> {
    require_role(&claims, Role::Admin, &uri)?;
    render_catalog(&state, &claims, Forms::default()).await
}

pub async fn create_author(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    uri: Uri,
    Form(form): Form<AuthorForm>,
) -> AppResult<Response> {
    require_role(&claims, Role::Admin, &uri)?;

    match state.services.catalog.create_author(&form).await? {
        Ok(_) => Ok(Redirect::to("/admin/catalog").into_response()),
        Err(errors) => {
            let forms = Forms {
                author: form,
                author_errors: errors,
                ..Forms::default()
            };
            Ok(render_catalog(&state, &claims, forms).await?.into_response())
        }
    }
}

pub async fn create_library(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    uri: Uri,
    Form(form): Form<LibraryForm>,
) -> AppResult<Response> {
    require_role(&claims, Role::Admin, &uri)?;

    match state.services.catalog.create_library(&form).await? {
        Ok(_) => Ok(Redirect::to("/admin/catalog").into_response()),
        Err(errors) => {
            let forms = Forms {
                library: form,
                library_errors: errors,
                ..Forms::default()
            };
            Ok(render_catalog(&state, &claims, forms).await?.into_response())
        }
    }
}

/// Put a book on a library's shelves
pub async fn add_library_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    uri: Uri,
    PathId(id): PathId,
    Form(form): Form<LibraryBookForm>,
) -> AppResult<Redirect> {
    require_role(&claims, Role::Admin, &uri)?;

    let book_id: i32 = form
        .book
        .trim()
        .parse()
        .map_err(|_| AppError::Validation("Select a valid book.".to_string()))?;
    state.services.catalog.add_book_to_library(id, book_id).await?;

    Ok(Redirect::to("/admin/catalog"))
}
