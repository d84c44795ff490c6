//! Registration, login, logout and profile pages

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppResult,
    models::{
        form::FormErrors,
        user::{LoginForm, RegisterForm},
    },
    AppState,
};

use super::{is_safe_redirect, AuthenticatedUser, CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct NextParam {
    pub next: Option<String>,
}

/// Empty registration form
pub async fn register_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Html<String>> {
    state.services.templates.render(
        "register",
        "Register",
        user.as_ref(),
        &json!({ "form": RegisterForm::default(), "errors": FormErrors::default() }),
    )
}

/// Create an account and continue to the login page
pub async fn register(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    match state.services.users.register(&form).await? {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(errors) => Ok(state
            .services
            .templates
            .render(
                "register",
                "Register",
                user.as_ref(),
                &json!({ "form": form, "errors": errors }),
            )?
            .into_response()),
    }
}

/// Login form, remembering where to go afterwards
pub async fn login_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<NextParam>,
) -> AppResult<Html<String>> {
    let form = LoginForm {
        next: params.next,
        ..LoginForm::default()
    };

    state.services.templates.render(
        "login",
        "Login",
        user.as_ref(),
        &json!({ "form": form, "errors": FormErrors::default() }),
    )
}

/// Check credentials, set the session cookie and redirect
pub async fn login(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Query(params): Query<NextParam>,
    Form(mut form): Form<LoginForm>,
) -> AppResult<Response> {
    if form.next.as_deref().map_or(true, str::is_empty) {
        form.next = params.next;
    }

    let (account, grants) = match state.services.users.authenticate(&form).await? {
        Ok(found) => found,
        Err(errors) => {
            return Ok(state
                .services
                .templates
                .render(
                    "login",
                    "Login",
                    user.as_ref(),
                    &json!({ "form": form, "errors": errors }),
                )?
                .into_response())
        }
    };

    let sessions = &state.services.sessions;
    let (token, claims) = sessions.issue(&account, &grants)?;
    tracing::info!(user_id = claims.user_id, role = %claims.role, "User logged in");

    let cookie = Cookie::build((sessions.cookie_name().to_string(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(sessions.cookie_secure());

    let destination = form
        .next
        .filter(|next| is_safe_redirect(next))
        .unwrap_or_else(|| state.config.auth.login_redirect.clone());

    Ok((jar.add(cookie), Redirect::to(&destination)).into_response())
}

/// End the session and show the logged-out page
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Html<String>)> {
    let sessions = &state.services.sessions;
    if let Some(claims) = user {
        sessions.revoke(&claims).await?;
        tracing::info!(user_id = claims.user_id, "User logged out");
    }

    let jar = jar.remove(Cookie::build((sessions.cookie_name().to_string(), "")).path("/"));
    let page = state
        .services
        .templates
        .render("logout", "Logged out", None, &())?;

    Ok((jar, page))
}

/// Current user's profile
pub async fn profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Html<String>> {
    let profile = state.services.users.get_by_id(claims.user_id).await?;

    state.services.templates.render(
        "profile",
        "Profile",
        Some(&claims),
        &json!({ "profile": profile }),
    )
}
