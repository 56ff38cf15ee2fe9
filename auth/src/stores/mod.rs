//! Store implementations for the authentication subsystem.
//!
//! - **Session cache** (Redis): validity projection with TTL
//! - **Challenge store** (Redis): phone codes with atomic consumption
//! - **Rate guard** (Redis): fixed-window counters, fail-open
//! - **Account / session repositories** (`PostgreSQL`): system of record

pub mod challenge_redis;
pub mod postgres;
pub mod rate_guard_redis;
pub mod session_cache_redis;

// Re-exports
pub use challenge_redis::RedisChallengeStore;
pub use postgres::{PostgresAccountRepository, PostgresSessionRepository};
pub use rate_guard_redis::RedisRateGuard;
pub use session_cache_redis::RedisSessionCache;
