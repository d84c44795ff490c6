//! Role-based landing pages and account administration

use axum::{
    extract::State,
    http::Uri,
    response::{Html, Redirect},
    Form,
};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::user::{Permission, PermissionForm, Role, RoleForm, UserSummary},
    AppState,
};

use super::{require_role, AuthenticatedUser, PathId};

fn user_rows(users: Vec<UserSummary>) -> Vec<Value> {
    users
        .into_iter()
        .map(|u| {
            let role_choices: Vec<Value> = Role::ALL
                .iter()
                .map(|r| json!({ "value": r.as_str(), "selected": *r == u.role }))
                .collect();
            json!({
                "id": u.id,
                "username": u.username,
                "role": u.role,
                "is_active": u.is_active,
                "permissions": u.permissions,
                "role_choices": role_choices,
            })
        })
        .collect()
}

/// Admin landing page with the account list
pub async fn admin_view(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    uri: Uri,
) -> AppResult<Html<String>> {
    require_role(&claims, Role::Admin, &uri)?;

    let users = state.services.users.list_users().await?;
    let permission_choices: Vec<&str> = Permission::ALL.iter().map(|p| p.codename()).collect();

    state.services.templates.render(
        "admin_view",
        "Admin",
        Some(&claims),
        &json!({
            "users": user_rows(users),
            "permission_choices": permission_choices,
        }),
    )
}

pub async fn librarian_view(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    uri: Uri,
) -> AppResult<Html<String>> {
    require_role(&claims, Role::Librarian, &uri)?;

    state
        .services
        .templates
        .render("librarian_view", "Librarian", Some(&claims), &())
}

pub async fn member_view(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    uri: Uri,
) -> AppResult<Html<String>> {
    require_role(&claims, Role::Member, &uri)?;

    state
        .services
        .templates
        .render("member_view", "Member", Some(&claims), &())
}

/// Change a user's role; open sessions pick it up on their next request
pub async fn update_role(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    uri: Uri,
    PathId(id): PathId,
    Form(form): Form<RoleForm>,
) -> AppResult<Redirect> {
    require_role(&claims, Role::Admin, &uri)?;

    let role: Role = form.role.parse().map_err(AppError::Validation)?;
    state.services.users.update_role(id, role).await?;

    Ok(Redirect::to("/admin"))
}

/// Grant or revoke an explicit permission
pub async fn update_permission(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    uri: Uri,
    PathId(id): PathId,
    Form(form): Form<PermissionForm>,
) -> AppResult<Redirect> {
    require_role(&claims, Role::Admin, &uri)?;

    let permission: Permission = form.permission.parse().map_err(AppError::Validation)?;
    match form.action.as_str() {
        "grant" => state.services.users.grant_permission(id, permission).await?,
        "revoke" => state.services.users.revoke_permission(id, permission).await?,
        other => {
            return Err(AppError::Validation(format!(
                "Unknown permission action: {}",
                other
            )))
        }
    }

    Ok(Redirect::to("/admin"))
}
