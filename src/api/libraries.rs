//! Library detail page

use axum::{
    extract::State,
    response::Html,
};

use crate::{error::AppResult, AppState};

use super::{CurrentUser, PathId};

/// Library with the books it holds
pub async fn library_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathId(id): PathId,
) -> AppResult<Html<String>> {
    let detail = state.services.catalog.get_library(id).await?;
    let title = detail.library.name.clone();

    state
        .services
        .templates
        .render("library_detail", &title, user.as_ref(), &detail)
}
