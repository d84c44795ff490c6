//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::BootstrapAdmin,
    error::{AppError, AppResult},
    models::{
        form::FormErrors,
        user::{
            effective_permissions, LoginForm, Permission, RegisterForm, Role, SessionClaims, User,
            UserSummary, INVALID_LOGIN,
        },
    },
    repository::Repository,
};

/// Outcome of a form submission: a value, or errors to show next to the form
pub type FormResult<T> = AppResult<Result<T, FormErrors>>;

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create a member account from the registration form
    pub async fn register(&self, form: &RegisterForm) -> FormResult<User> {
        if let Err(errors) = form.clean() {
            return Ok(Err(errors));
        }

        if self.repository.users.username_exists(&form.username).await? {
            let mut errors = FormErrors::default();
            errors.add("username", "A user with that username already exists.");
            return Ok(Err(errors));
        }

        let hash = hash_password(&form.password1)?;
        let user = match self
            .repository
            .users
            .create(&form.username, &hash, Role::Member)
            .await
        {
            Ok(user) => user,
            // Lost a race with a concurrent registration
            Err(AppError::Conflict(message)) => {
                let mut errors = FormErrors::default();
                errors.add("username", message);
                return Ok(Err(errors));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(Ok(user))
    }

    /// Check credentials; returns the user and its explicit permission grants
    pub async fn authenticate(&self, form: &LoginForm) -> FormResult<(User, Vec<String>)> {
        if let Err(errors) = form.clean() {
            return Ok(Err(errors));
        }

        let user = match self.repository.users.get_by_username(&form.username).await? {
            Some(user) => user,
            None => return Ok(Err(FormErrors::non_field(INVALID_LOGIN))),
        };

        if !user.is_active || !verify_password(&user, &form.password)? {
            tracing::info!(username = %form.username, "Rejected login");
            return Ok(Err(FormErrors::non_field(INVALID_LOGIN)));
        }

        self.repository.users.touch_last_login(user.id).await?;
        let grants = self.repository.users.get_permission_grants(user.id).await?;

        Ok(Ok((user, grants)))
    }

    /// Bring decoded claims up to date with the stored account.
    ///
    /// Role and permissions come from the database, not from the token, so an
    /// admin's change applies to sessions that are already open. Deleted or
    /// deactivated accounts yield `None`.
    pub async fn refresh_session(&self, mut claims: SessionClaims) -> AppResult<Option<SessionClaims>> {
        let user = match self.repository.users.find_by_id(claims.user_id).await? {
            Some(user) if user.is_active => user,
            _ => {
                tracing::debug!(user_id = claims.user_id, "Session for missing or inactive account");
                return Ok(None);
            }
        };
        let grants = self.repository.users.get_permission_grants(user.id).await?;

        claims.sub = user.username;
        claims.role = user.role;
        claims.permissions = effective_permissions(user.role, &grants);
        Ok(Some(claims))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Every account with role and grants
    pub async fn list_users(&self) -> AppResult<Vec<UserSummary>> {
        self.repository.users.list_summaries().await
    }

    /// Change a user's profile role
    pub async fn update_role(&self, user_id: i32, role: Role) -> AppResult<()> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.users.update_role(user_id, role).await?;
        tracing::info!(user_id, role = %role, "Role updated");
        Ok(())
    }

    pub async fn grant_permission(&self, user_id: i32, permission: Permission) -> AppResult<()> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.users.grant_permission(user_id, permission).await?;
        tracing::info!(user_id, permission = %permission, "Permission granted");
        Ok(())
    }

    pub async fn revoke_permission(&self, user_id: i32, permission: Permission) -> AppResult<()> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.users.revoke_permission(user_id, permission).await?;
        tracing::info!(user_id, permission = %permission, "Permission revoked");
        Ok(())
    }

    /// Create the configured administrator when it does not exist yet
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> AppResult<()> {
        if self.repository.users.username_exists(&admin.username).await? {
            return Ok(());
        }

        let hash = hash_password(&admin.password)?;
        let user = self
            .repository
            .users
            .create(&admin.username, &hash, Role::Admin)
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "Bootstrap administrator created");
        Ok(())
    }
}

/// Verify user password
pub fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}
