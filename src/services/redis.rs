//! Redis service for revoked session tokens

use redis::{AsyncCommands, Client};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }

    /// Mark a token id as revoked until it would have expired anyway
    pub async fn revoke_token(&self, jti: &str, expiration_seconds: u64) -> AppResult<()> {
        let mut conn = self.connection().await?;

        let key = format!("session:revoked:{}", jti);
        conn.set_ex::<_, _, ()>(&key, "1", expiration_seconds.max(1))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store revoked session in Redis: {}", e)))?;

        Ok(())
    }

    /// Check if a token id has been revoked
    pub async fn is_token_revoked(&self, jti: &str) -> AppResult<bool> {
        let mut conn = self.connection().await?;

        let key = format!("session:revoked:{}", jti);
        let exists: bool = conn
            .exists(&key)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to check revoked session in Redis: {}", e)))?;

        Ok(exists)
    }
}
