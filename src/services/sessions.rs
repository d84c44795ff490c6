//! Session tokens: issuing, decoding and revocation on logout

use async_trait::async_trait;
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{effective_permissions, SessionClaims, User},
};

use super::redis::RedisService;

/// Where revoked token ids are remembered until they expire
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn revoke(&self, jti: &str, ttl_seconds: u64) -> AppResult<()>;
    async fn is_revoked(&self, jti: &str) -> AppResult<bool>;
}

#[async_trait]
impl RevocationStore for RedisService {
    async fn revoke(&self, jti: &str, ttl_seconds: u64) -> AppResult<()> {
        self.revoke_token(jti, ttl_seconds).await
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        self.is_token_revoked(jti).await
    }
}

/// In-process store; revocations do not survive a restart
#[derive(Default)]
pub struct MemoryRevocationStore {
    revoked: RwLock<HashMap<String, i64>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, jti: &str, ttl_seconds: u64) -> AppResult<()> {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expires_at| *expires_at > now);
        revoked.insert(jti.to_string(), now + ttl_seconds as i64);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        let now = Utc::now().timestamp();
        Ok(self
            .revoked
            .read()
            .await
            .get(jti)
            .map(|expires_at| *expires_at > now)
            .unwrap_or(false))
    }
}

#[derive(Clone)]
pub struct SessionService {
    config: AuthConfig,
    store: Arc<dyn RevocationStore>,
}

impl SessionService {
    pub fn new(config: AuthConfig, store: Arc<dyn RevocationStore>) -> Self {
        Self { config, store }
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    pub fn cookie_secure(&self) -> bool {
        self.config.cookie_secure
    }

    /// Build claims for a user and sign them
    pub fn issue(&self, user: &User, grants: &[String]) -> AppResult<(String, SessionClaims)> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = SessionClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            permissions: effective_permissions(user.role, grants),
            jti: Uuid::new_v4().to_string(),
            exp,
            iat: now,
        };

        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok((token, claims))
    }

    /// Claims for a cookie value; `None` when the token is invalid, expired or revoked.
    ///
    /// A revocation store that cannot be reached also yields `None`, so public
    /// pages keep working without Redis.
    pub async fn decode(&self, token: &str) -> Option<SessionClaims> {
        let claims = match SessionClaims::from_token(token, &self.config.jwt_secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Ignoring invalid session token: {}", e);
                return None;
            }
        };

        match self.store.is_revoked(&claims.jti).await {
            Ok(false) => Some(claims),
            Ok(true) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Revocation lookup failed, treating request as anonymous");
                None
            }
        }
    }

    /// Revoke a session for the rest of its lifetime
    pub async fn revoke(&self, claims: &SessionClaims) -> AppResult<()> {
        let remaining = (claims.exp - Utc::now().timestamp()).max(1) as u64;
        self.store.revoke(&claims.jti, remaining).await?;
        tracing::info!(user_id = claims.user_id, "Session revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Permission, Role};

    fn user(role: Role) -> User {
        User {
            id: 42,
            username: "marian".to_string(),
            password: String::new(),
            email: None,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
            role,
        }
    }

    fn service() -> SessionService {
        SessionService::new(AuthConfig::default(), Arc::new(MemoryRevocationStore::new()))
    }

    #[tokio::test]
    async fn issued_token_decodes_with_role_permissions() {
        let sessions = service();
        let (token, issued) = sessions
            .issue(&user(Role::Member), &["can_delete_book".to_string()])
            .unwrap();

        let claims = sessions.decode(&token).await.unwrap();
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.sub, "marian");
        assert_eq!(claims.role, Role::Member);
        assert!(claims.has_permission(Permission::CanDeleteBook));
        assert!(!claims.has_permission(Permission::CanAddBook));
    }

    #[tokio::test]
    async fn revoked_token_is_anonymous() {
        let sessions = service();
        let (token, claims) = sessions.issue(&user(Role::Admin), &[]).unwrap();

        sessions.revoke(&claims).await.unwrap();
        assert!(sessions.decode(&token).await.is_none());
    }

    #[tokio::test]
    async fn garbage_token_is_anonymous() {
        assert!(service().decode("not-a-jwt").await.is_none());
    }

    struct UnreachableStore;

    #[async_trait]
    impl RevocationStore for UnreachableStore {
        async fn revoke(&self, _jti: &str, _ttl_seconds: u64) -> AppResult<()> {
            Err(AppError::Internal("connection refused".to_string()))
        }

        async fn is_revoked(&self, _jti: &str) -> AppResult<bool> {
            Err(AppError::Internal("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn unreachable_store_means_anonymous() {
        let sessions = SessionService::new(AuthConfig::default(), Arc::new(UnreachableStore));
        let (token, _) = sessions.issue(&user(Role::Member), &[]).unwrap();
        assert!(sessions.decode(&token).await.is_none());
    }

    #[tokio::test]
    async fn memory_store_forgets_expired_entries() {
        let store = MemoryRevocationStore::new();
        store.revoke("a", 0).await.unwrap();
        assert!(!store.is_revoked("a").await.unwrap());
        store.revoke("b", 60).await.unwrap();
        assert!(store.is_revoked("b").await.unwrap());
        assert!(!store.is_revoked("c").await.unwrap());
    }
}
