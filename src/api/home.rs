//! Home page

use axum::{extract::State, response::Html};

use crate::{error::AppResult, AppState};

use super::CurrentUser;

pub async fn home(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Html<String>> {
    state
        .services
        .templates
        .render("home", "Home", user.as_ref(), &())
}
