//! Redis-based session validity cache.
//!
//! Write-through projection of durable session existence:
//! - **Key**: `session:{session_id}` → owning account id
//! - **TTL**: the session's remaining durable lifetime
//!
//! A present entry means the session is valid; a missing entry means
//! nothing; the durable repository decides, and callers repopulate
//! the entry on a valid miss.

use crate::error::{AuthError, Result};
use crate::providers::SessionCache;
use crate::state::{AccountId, SessionId};
use chrono::Duration;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis-based session validity cache.
///
/// Connection pooling via `ConnectionManager`; bulk deletions are
/// pipelined into a single round trip.
#[derive(Clone)]
pub struct RedisSessionCache {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisSessionCache {
    /// Create a new Redis session cache.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "<redis://127.0.0.1:6379>")
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AuthError::CacheError(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::CacheError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    /// Get the Redis key for a session entry.
    fn session_key(session_id: SessionId) -> String {
        format!("session:{}", session_id.0)
    }
}

impl SessionCache for RedisSessionCache {
    async fn put(&self, session_id: SessionId, account_id: AccountId, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let key = Self::session_key(session_id);

        #[allow(clippy::cast_sign_loss)]
        let ttl_seconds = ttl.num_seconds().max(1) as u64;

        let _: () = conn
            .set_ex(&key, account_id.0.to_string(), ttl_seconds)
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to write cache entry: {e}")))?;

        tracing::debug!(
            session_id = %session_id.0,
            ttl_seconds = ttl_seconds,
            "Cached session validity"
        );

        Ok(())
    }

    async fn get(&self, session_id: SessionId) -> Result<Option<AccountId>> {
        let mut conn = self.conn_manager.clone();
        let key = Self::session_key(session_id);

        let value: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to read cache entry: {e}")))?;

        match value {
            Some(raw) => {
                let account_id = raw
                    .parse::<uuid::Uuid>()
                    .map_err(|e| AuthError::CacheError(format!("Corrupt cache entry: {e}")))?;
                Ok(Some(AccountId(account_id)))
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, session_id: SessionId) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let key = Self::session_key(session_id);

        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to delete cache entry: {e}")))?;

        Ok(())
    }

    async fn remove_many(&self, session_ids: &[SessionId]) -> Result<()> {
        if session_ids.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn_manager.clone();

        let mut pipe = redis::pipe();
        for session_id in session_ids {
            pipe.del(Self::session_key(*session_id)).ignore();
        }

        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to delete cache entries: {e}")))?;

        tracing::debug!(count = session_ids.len(), "Purged session cache entries");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_cache_lifecycle() {
        let cache = RedisSessionCache::new("redis://127.0.0.1:6379").await.unwrap();

        let session_id = SessionId::new();
        let account_id = AccountId::new();

        cache.put(session_id, account_id, Duration::hours(1)).await.unwrap();
        assert_eq!(cache.get(session_id).await.unwrap(), Some(account_id));

        cache.remove(session_id).await.unwrap();
        assert_eq!(cache.get(session_id).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_bulk_removal() {
        let cache = RedisSessionCache::new("redis://127.0.0.1:6379").await.unwrap();

        let account_id = AccountId::new();
        let ids: Vec<SessionId> = (0..3).map(|_| SessionId::new()).collect();

        for id in &ids {
            cache.put(*id, account_id, Duration::hours(1)).await.unwrap();
        }

        cache.remove_many(&ids).await.unwrap();

        for id in &ids {
            assert_eq!(cache.get(*id).await.unwrap(), None);
        }
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_entry_expires_with_ttl() {
        let cache = RedisSessionCache::new("redis://127.0.0.1:6379").await.unwrap();

        let session_id = SessionId::new();
        cache
            .put(session_id, AccountId::new(), Duration::seconds(1))
            .await
            .unwrap();

        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

        assert_eq!(cache.get(session_id).await.unwrap(), None);
    }
}
