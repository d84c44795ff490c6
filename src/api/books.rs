//! Book list and permission-gated book CRUD pages

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::{
        author::Author,
        book::BookForm,
        form::FormErrors,
        user::{require_permission, Permission, SessionClaims},
    },
    AppState,
};

use super::{CurrentUser, PathId};

/// List all books
pub async fn list_books(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Html<String>> {
    let books = state.services.catalog.list_books().await?;

    state
        .services
        .templates
        .render("list_books", "Books", user.as_ref(), &json!({ "books": books }))
}

/// Author choices with the submitted one marked as selected
fn author_choices(authors: &[Author], selected: &str) -> Vec<Value> {
    authors
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "name": a.name,
                "selected": a.id.to_string() == selected.trim(),
            })
        })
        .collect()
}

struct BookPage<'a> {
    template: &'a str,
    title: &'a str,
    book_id: Option<i32>,
}

fn render_book_form(
    state: &AppState,
    page: BookPage<'_>,
    user: Option<&SessionClaims>,
    form: &BookForm,
    authors: &[Author],
    errors: &FormErrors,
) -> AppResult<Html<String>> {
    state.services.templates.render(
        page.template,
        page.title,
        user,
        &json!({
            "form": form,
            "authors": author_choices(authors, &form.author),
            "errors": errors,
            "book_id": page.book_id,
        }),
    )
}

const ADD_PAGE: BookPage<'static> = BookPage {
    template: "add_book",
    title: "Add Book",
    book_id: None,
};

fn edit_page(id: i32) -> BookPage<'static> {
    BookPage {
        template: "edit_book",
        title: "Edit Book",
        book_id: Some(id),
    }
}

/// Empty add form
pub async fn add_book_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Html<String>> {
    require_permission(user.as_ref(), Permission::CanAddBook)?;

    let authors = state.services.catalog.list_authors().await?;
    render_book_form(
        &state,
        ADD_PAGE,
        user.as_ref(),
        &BookForm::default(),
        &authors,
        &FormErrors::default(),
    )
}

/// Create a book, or redisplay the form with errors
pub async fn add_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<BookForm>,
) -> AppResult<Response> {
    require_permission(user.as_ref(), Permission::CanAddBook)?;

    let authors = state.services.catalog.list_authors().await?;
    match state.services.catalog.create_book(&form, &authors).await? {
        Ok(_) => Ok(Redirect::to("/books").into_response()),
        Err(errors) => {
            Ok(render_book_form(&state, ADD_PAGE, user.as_ref(), &form, &authors, &errors)?
                .into_response())
        }
    }
}

/// Edit form pre-filled from the stored book
pub async fn edit_book_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathId(id): PathId,
) -> AppResult<Html<String>> {
    require_permission(user.as_ref(), Permission::CanChangeBook)?;

    let book = state.services.catalog.get_book(id).await?;
    let authors = state.services.catalog.list_authors().await?;
    render_book_form(
        &state,
        edit_page(id),
        user.as_ref(),
        &BookForm::from_book(&book),
        &authors,
        &FormErrors::default(),
    )
}

/// Update a book, or redisplay the form with errors
pub async fn edit_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathId(id): PathId,
    Form(form): Form<BookForm>,
) -> AppResult<Response> {
    require_permission(user.as_ref(), Permission::CanChangeBook)?;

    state.services.catalog.get_book(id).await?;
    let authors = state.services.catalog.list_authors().await?;
    match state.services.catalog.update_book(id, &form, &authors).await? {
        Ok(_) => Ok(Redirect::to("/books").into_response()),
        Err(errors) => Ok(
            render_book_form(&state, edit_page(id), user.as_ref(), &form, &authors, &errors)?
                .into_response(),
        ),
    }
}

/// Deletion confirmation page
pub async fn delete_book_confirm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathId(id): PathId,
) -> AppResult<Html<String>> {
    require_permission(user.as_ref(), Permission::CanDeleteBook)?;

    let book = state.services.catalog.get_book(id).await?;
    state
        .services
        .templates
        .render("delete_book", "Delete Book", user.as_ref(), &json!({ "book": book }))
}

/// Delete a book
pub async fn delete_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathId(id): PathId,
) -> AppResult<Redirect> {
    require_permission(user.as_ref(), Permission::CanDeleteBook)?;

    state.services.catalog.get_book(id).await?;
    state.services.catalog.delete_book(id).await?;
    Ok(Redirect::to("/books"))
}
