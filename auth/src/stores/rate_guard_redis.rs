//! Redis-based fixed-window rate guard.
//!
//! # Algorithm
//!
//! One counter per key: INCR, with the window's EXPIRE set on the
//! first increment, all inside a single Lua script. The counter
//! resets when the window elapses after the first attempt in it.
//! Fixed-window semantics bound abuse; they do not aim for the
//! fairness of a sliding window.
//!
//! # Availability
//!
//! Fails **open**: a Redis failure admits the request (logged at
//! warn). Locking every user out of the login path because the
//! counter backend is down is the worse failure mode.

use crate::error::{AuthError, Result};
use crate::providers::RateGuard;
use redis::aio::ConnectionManager;
use redis::Client;
use std::time::Duration;

/// Count and inspect in one atomic operation.
///
/// Returns `{count, remaining_ttl}`; the EXPIRE is applied only when
/// this increment opened the window.
const COUNT_ATTEMPT: &str = r"
    local count = redis.call('INCR', KEYS[1])
    if count == 1 then
        redis.call('EXPIRE', KEYS[1], ARGV[1])
    end
    local ttl = redis.call('TTL', KEYS[1])
    return {count, ttl}
";

/// Redis-based fixed-window rate guard.
#[derive(Clone)]
pub struct RedisRateGuard {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisRateGuard {
    /// Create a new Redis rate guard.
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

    /// Get the Redis key for a counter.
    fn rate_key(key: &str) -> String {
        format!("rate:{key}")
    }
}

impl RateGuard for RedisRateGuard {
    async fn admit(&self, key: &str, max_attempts: u32, window: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let rate_key = Self::rate_key(key);

        let result: redis::RedisResult<(u64, i64)> = redis::Script::new(COUNT_ATTEMPT)
            .key(&rate_key)
            .arg(window.as_secs())
            .invoke_async(&mut conn)
            .await;

        let (count, ttl_seconds) = match result {
            Ok(counted) => counted,
            Err(e) => {
                // Fail open: admit rather than lock out every user
                // while the counter backend is unhealthy.
                tracing::warn!(
                    key = %key,
                    error = %e,
                    "Rate guard store failure, admitting request (fail open)"
                );
                return Ok(());
            }
        };

        if count > u64::from(max_attempts) {
            #[allow(clippy::cast_sign_loss)]
            let retry_after = Duration::from_secs(ttl_seconds.max(0) as u64);

            tracing::warn!(
                key = %key,
                attempts = count,
                max_attempts = max_attempts,
                "Rate limit exceeded"
            );

            return Err(AuthError::RateLimited { retry_after });
        }

        tracing::debug!(
            key = %key,
            attempts = count,
            max_attempts = max_attempts,
            "Rate guard admitted request"
        );

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
    async fn test_allows_within_limit_then_blocks() {
        let guard = RedisRateGuard::new("redis://127.0.0.1:6379").await.unwrap();
        let key = format!("test:block:{}", uuid::Uuid::new_v4());

        for i in 1..=5 {
            assert!(
                guard.admit(&key, 5, Duration::from_secs(60)).await.is_ok(),
                "attempt {i} should be admitted"
            );
        }

        let result = guard.admit(&key, 5, Duration::from_secs(60)).await;
        assert!(matches!(result, Err(AuthError::RateLimited { .. })));
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_window_resets() {
        let guard = RedisRateGuard::new("redis://127.0.0.1:6379").await.unwrap();
        let key = format!("test:reset:{}", uuid::Uuid::new_v4());

        for _ in 0..2 {
            guard.admit(&key, 2, Duration::from_secs(1)).await.unwrap();
        }
        assert!(guard.admit(&key, 2, Duration::from_secs(1)).await.is_err());

        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

        assert!(guard.admit(&key, 2, Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_retry_after_reflects_window() {
        let guard = RedisRateGuard::new("redis://127.0.0.1:6379").await.unwrap();
        let key = format!("test:retry:{}", uuid::Uuid::new_v4());

        guard.admit(&key, 1, Duration::from_secs(60)).await.unwrap();

        match guard.admit(&key, 1, Duration::from_secs(60)).await {
            Err(AuthError::RateLimited { retry_after }) => {
                assert!(retry_after.as_secs() > 0 && retry_after.as_secs() <= 60);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }
}
