//! Users repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{Permission, Role, User, UserSummary},
};

const USER_COLUMNS: &str = r#"
    u.id, u.username, u.password, u.email, u.is_active, u.date_joined, u.last_login,
    COALESCE(p.role, 'Member') AS role
"#;

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {}
            FROM users u
            LEFT JOIN user_profiles p ON p.user_id = u.id
            WHERE u.id = $1
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get user by exact username (login is case-sensitive)
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {}
            FROM users u
            LEFT JOIN user_profiles p ON p.user_id = u.id
            WHERE u.username = $1
            "#,
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check if a username is taken, ignoring case
    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Create a user together with its profile
    pub async fn create(&self, username: &str, password_hash: &str, role: Role) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, password, is_active, date_joined)
            VALUES ($1, $2, TRUE, NOW())
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("A user with that username already exists.".to_string())
            }
            other => AppError::Database(other),
        })?;

        sqlx::query("INSERT INTO user_profiles (user_id, role) VALUES ($1, $2)")
            .bind(id)
            .bind(role)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Record a successful login
    pub async fn touch_last_login(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All users with role and explicit grants, for the admin page
    pub async fn list_summaries(&self) -> AppResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, COALESCE(p.role, 'Member') AS role, u.is_active,
                   COALESCE(
                       ARRAY_AGG(up.codename::text ORDER BY up.codename)
                           FILTER (WHERE up.codename IS NOT NULL),
                       '{}'::text[]
                   ) AS permissions
            FROM users u
            LEFT JOIN user_profiles p ON p.user_id = u.id
            LEFT JOIN user_permissions up ON up.user_id = u.id
            GROUP BY u.id, u.username, p.role, u.is_active
            ORDER BY LOWER(u.username)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Set the profile role, creating the profile row when missing
    pub async fn update_role(&self, user_id: i32, role: Role) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, role) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Explicitly granted permission codenames
    pub async fn get_permission_grants(&self, user_id: i32) -> AppResult<Vec<String>> {
        let grants: Vec<String> = sqlx::query_scalar(
            "SELECT codename FROM user_permissions WHERE user_id = $1 ORDER BY codename",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }

    pub async fn grant_permission(&self, user_id: i32, permission: Permission) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_permissions (user_id, codename) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(permission.codename())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn revoke_permission(&self, user_id: i32, permission: Permission) -> AppResult<()> {
        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1 AND codename = $2")
            .bind(user_id)
            .bind(permission.codename())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
