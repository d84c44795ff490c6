//! User model, roles, permissions and session claims

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use std::collections::BTreeSet;
use validator::Validate;

use super::form::FormErrors;
use crate::error::AppError;

/// Profile role used to gate the landing pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Librarian,
    #[default]
    Member,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Librarian, Role::Member];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Librarian => "Librarian",
            Role::Member => "Member",
        }
    }

    /// Permissions every user with this role holds without an explicit grant
    pub fn default_permissions(&self) -> &'static [Permission] {
        match self {
            Role::Admin | Role::Librarian => &Permission::ALL,
            Role::Member => &[],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Librarian" => Ok(Role::Librarian),
            "Member" => Ok(Role::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

// SQLx conversion for Role (stored as text in user_profiles.role)
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        Ok(Role::from(s))
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Capability checked before a catalog mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "relationship_app.can_add_book")]
    CanAddBook,
    #[serde(rename = "relationship_app.can_change_book")]
    CanChangeBook,
    #[serde(rename = "relationship_app.can_delete_book")]
    CanDeleteBook,
}

impl Permission {
    pub const ALL: [Permission; 3] = [
        Permission::CanAddBook,
        Permission::CanChangeBook,
        Permission::CanDeleteBook,
    ];

    pub fn codename(&self) -> &'static str {
        match self {
            Permission::CanAddBook => "relationship_app.can_add_book",
            Permission::CanChangeBook => "relationship_app.can_change_book",
            Permission::CanDeleteBook => "relationship_app.can_delete_book",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.codename())
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    /// Accepts the full codename or the bare `can_*` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.strip_prefix("relationship_app.").unwrap_or(s);
        match bare {
            "can_add_book" => Ok(Permission::CanAddBook),
            "can_change_book" => Ok(Permission::CanChangeBook),
            "can_delete_book" => Ok(Permission::CanDeleteBook),
            _ => Err(format!("Unknown permission: {}", s)),
        }
    }
}

/// Full user model from database (users joined with user_profiles)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub role: Role,
}

/// Row shown on the admin page
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub is_active: bool,
    #[sqlx(default)]
    pub permissions: Vec<String>,
}

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"));

/// Registration form
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct RegisterForm {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this value has at most 150 characters."),
        regex(path = *USERNAME_RE, message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.")
    )]
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

pub const MIN_PASSWORD_LENGTH: usize = 8;

impl RegisterForm {
    /// Field-level checks; username uniqueness is checked against the database separately
    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        if self.username.is_empty() {
            errors.add("username", "This field is required.");
        } else if let Err(e) = self.validate() {
            errors.extend_validation(e);
        }

        if self.password1.is_empty() {
            errors.add("password1", "This field is required.");
        }
        if self.password2.is_empty() {
            errors.add("password2", "This field is required.");
        }

        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", "The two password fields didn’t match.");
            } else {
                for message in password_problems(&self.password1, &self.username) {
                    errors.add("password2", message);
                }
            }
        }

        errors.into_result()
    }
}

fn password_problems(password: &str, username: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        problems.push("The password is too similar to the username.".to_string());
    }
    problems
}

pub const INVALID_LOGIN: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Login form
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.username.trim().is_empty() {
            errors.add("username", "This field is required.");
        }
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        }
        errors.into_result()
    }
}

/// Admin role change form
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

/// Admin permission grant/revoke form
#[derive(Debug, Deserialize)]
pub struct PermissionForm {
    pub permission: String,
    /// `grant` or `revoke`
    pub action: String,
}

/// JWT claims carried by the session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub permissions: BTreeSet<Permission>,
    /// Token id, used to revoke the session on logout
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

/// True when the request is authenticated and the profile role matches
pub fn check_role(claims: Option<&SessionClaims>, role: Role) -> bool {
    claims.map(|c| c.has_role(role)).unwrap_or(false)
}

/// Permission gate that answers 403 for anonymous and unprivileged users alike
pub fn require_permission(
    claims: Option<&SessionClaims>,
    permission: Permission,
) -> Result<(), AppError> {
    match claims {
        Some(c) if c.has_permission(permission) => Ok(()),
        _ => Err(AppError::Authorization(format!(
            "Permission {} required",
            permission
        ))),
    }
}

/// Effective permissions: role defaults plus explicit grants
pub fn effective_permissions(role: Role, grants: &[String]) -> BTreeSet<Permission> {
    role.default_permissions()
        .iter()
        .copied()
        .chain(grants.iter().filter_map(|g| g.parse().ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role, permissions: &[Permission]) -> SessionClaims {
        SessionClaims {
            sub: "alice".to_string(),
            user_id: 1,
            role,
            permissions: permissions.iter().copied().collect(),
            jti: "jti-1".to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
        }
    }

    #[test]
    fn role_text_round_trips_and_unknown_is_member() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(Role::from("superuser".to_string()), Role::Member);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn permission_accepts_bare_and_full_codenames() {
        assert_eq!(
            "can_add_book".parse::<Permission>().unwrap(),
            Permission::CanAddBook
        );
        assert_eq!(
            "relationship_app.can_delete_book".parse::<Permission>().unwrap(),
            Permission::CanDeleteBook
        );
        assert!("can_eat_book".parse::<Permission>().is_err());
    }

    #[test]
    fn effective_permissions_merge_grants() {
        assert!(effective_permissions(Role::Member, &[]).is_empty());
        let member = effective_permissions(
            Role::Member,
            &["relationship_app.can_add_book".to_string(), "junk".to_string()],
        );
        assert_eq!(member.len(), 1);
        assert!(member.contains(&Permission::CanAddBook));
        assert_eq!(effective_permissions(Role::Librarian, &[]).len(), 3);
    }

    #[test]
    fn permission_gate_rejects_anonymous() {
        let err = require_permission(None, Permission::CanAddBook).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let member = claims(Role::Member, &[]);
        assert!(require_permission(Some(&member), Permission::CanChangeBook).is_err());

        let granted = claims(Role::Member, &[Permission::CanChangeBook]);
        assert!(require_permission(Some(&granted), Permission::CanChangeBook).is_ok());
    }

    #[test]
    fn check_role_requires_authentication() {
        assert!(!check_role(None, Role::Member));
        let admin = claims(Role::Admin, &[]);
        assert!(check_role(Some(&admin), Role::Admin));
        assert!(!check_role(Some(&admin), Role::Librarian));
    }

    #[test]
    fn token_round_trip_and_wrong_secret() {
        let original = claims(Role::Librarian, &Permission::ALL);
        let token = original.create_token("secret").unwrap();
        let decoded = SessionClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.role, Role::Librarian);
        assert_eq!(decoded.permissions.len(), 3);
        assert!(SessionClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn register_form_rules() {
        let form = RegisterForm {
            username: "new user!".to_string(),
            password1: "12345678".to_string(),
            password2: "12345678".to_string(),
        };
        let errors = form.clean().unwrap_err();
        assert!(errors.fields.contains_key("username"));
        assert!(errors.fields["password2"]
            .iter()
            .any(|m| m.contains("entirely numeric")));

        let mismatch = RegisterForm {
            username: "bob".to_string(),
            password1: "correct horse".to_string(),
            password2: "battery staple".to_string(),
        };
        let errors = mismatch.clean().unwrap_err();
        assert_eq!(
            errors.fields["password2"],
            vec!["The two password fields didn’t match.".to_string()]
        );

        let ok = RegisterForm {
            username: "bob.smith@x".to_string(),
            password1: "correct horse".to_string(),
            password2: "correct horse".to_string(),
        };
        assert!(ok.clean().is_ok());
    }

    #[test]
    fn register_form_rejects_short_and_similar_passwords() {
        let form = RegisterForm {
            username: "bobbybob".to_string(),
            password1: "BobbyBob".to_string(),
            password2: "BobbyBob".to_string(),
        };
        let errors = form.clean().unwrap_err();
        assert!(errors.fields["password2"]
            .iter()
            .any(|m| m.contains("too similar")));

        let short = RegisterForm {
            username: "bob".to_string(),
            password1: "abc".to_string(),
            password2: "abc".to_string(),
        };
        assert!(short.clean().unwrap_err().fields["password2"][0].contains("too short"));
    }

    #[test]
    fn login_form_requires_both_fields() {
        let errors = LoginForm::default().clean().unwrap_err();
        assert!(errors.fields.contains_key("username"));
        assert!(errors.fields.contains_key("password"));
    }
}
