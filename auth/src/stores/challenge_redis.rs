//! Redis-based phone challenge store.
//!
//! Verification codes are stored with:
//! - **Key**: `phone_code:{phone}` → the 6-digit code
//! - **TTL**: short (default 5 minutes)
//! - **Atomic consumption**: a Lua compare-and-delete checks and
//!   removes the code in one server-side operation, so a code verifies
//!   at most once even under concurrent attempts, while a mismatch
//!   leaves the challenge in place until its TTL runs out.

use crate::error::{AuthError, Result};
use crate::providers::{ChallengeStore, CodeCheck};
use chrono::Duration;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Compare-and-delete: consumes the stored code only on a match.
///
/// Returns 1 on match (deleted), 0 on mismatch, -1 when absent.
const CONSUME_IF_MATCH: &str = r"
    local stored = redis.call('GET', KEYS[1])
    if stored == false then
        return -1
    end
    if stored == ARGV[1] then
        redis.call('DEL', KEYS[1])
        return 1
    end
    return 0
";

/// Redis-based challenge store with atomic single-use consumption.
#[derive(Clone)]
pub struct RedisChallengeStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisChallengeStore {
    /// Create a new Redis challenge store.
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

    /// Get the Redis key for a phone's challenge.
    fn code_key(phone: &str) -> String {
        format!("phone_code:{phone}")
    }
}

impl ChallengeStore for RedisChallengeStore {
    async fn put_code(&self, phone: &str, code: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let key = Self::code_key(phone);

        #[allow(clippy::cast_sign_loss)]
        let ttl_seconds = ttl.num_seconds().max(1) as u64;

        // SET with EX replaces any previous code and resets the TTL.
        let _: () = conn
            .set_ex(&key, code, ttl_seconds)
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to store code: {e}")))?;

        tracing::debug!(phone = %phone, ttl_seconds = ttl_seconds, "Stored verification code");

        Ok(())
    }

    async fn consume_if_match(&self, phone: &str, code: &str) -> Result<CodeCheck> {
        let mut conn = self.conn_manager.clone();
        let key = Self::code_key(phone);

        let outcome: i64 = redis::Script::new(CONSUME_IF_MATCH)
            .key(&key)
            .arg(code)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AuthError::CacheError(format!("Failed to consume code: {e}")))?;

        Ok(match outcome {
            1 => CodeCheck::Matched,
            0 => CodeCheck::Mismatch,
            _ => CodeCheck::Missing,
        })
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
    async fn test_code_single_use() {
        let store = RedisChallengeStore::new("redis://127.0.0.1:6379").await.unwrap();
        let phone = format!("+1555{}", rand::random::<u32>() % 10_000_000);

        store.put_code(&phone, "123456", Duration::minutes(5)).await.unwrap();

        assert_eq!(
            store.consume_if_match(&phone, "123456").await.unwrap(),
            CodeCheck::Matched
        );
        assert_eq!(
            store.consume_if_match(&phone, "123456").await.unwrap(),
            CodeCheck::Missing
        );
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_mismatch_retains_challenge() {
        let store = RedisChallengeStore::new("redis://127.0.0.1:6379").await.unwrap();
        let phone = format!("+1555{}", rand::random::<u32>() % 10_000_000);

        store.put_code(&phone, "123456", Duration::minutes(5)).await.unwrap();

        assert_eq!(
            store.consume_if_match(&phone, "000000").await.unwrap(),
            CodeCheck::Mismatch
        );
        // The correct code still works after a failed guess.
        assert_eq!(
            store.consume_if_match(&phone, "123456").await.unwrap(),
            CodeCheck::Matched
        );
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_concurrent_consumption_single_winner() {
        let store = RedisChallengeStore::new("redis://127.0.0.1:6379").await.unwrap();
        let phone = format!("+1555{}", rand::random::<u32>() % 10_000_000);

        store.put_code(&phone, "123456", Duration::minutes(5)).await.unwrap();

        let mut handles = vec![];
        for _ in 0..10 {
            let store = store.clone();
            let phone = phone.clone();
            handles.push(tokio::spawn(async move {
                store.consume_if_match(&phone, "123456").await.unwrap()
            }));
        }

        let mut matched = 0;
        for handle in handles {
            if handle.await.unwrap() == CodeCheck::Matched {
                matched += 1;
            }
        }

        assert_eq!(matched, 1, "Exactly one concurrent verify should consume the code");
    }
}
