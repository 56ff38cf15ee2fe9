//! Rate guard trait for code sends and login attempts.

use crate::error::Result;
use std::time::Duration;

/// Fixed-window admission counter over the fast store.
///
/// Bounds abuse of the code-send and verification paths; it does not
/// aim for precise fairness. The counter is scoped to `key` and resets
/// `window` after the first attempt in the window.
///
/// # Availability
///
/// Implementations backed by an external store must **fail open**: if
/// the store is unhealthy, log and admit the request rather than lock
/// every user out of the login path. Only an actual over-limit count
/// produces `AuthError::RateLimited`.
pub trait RateGuard: Send + Sync {
    /// Count an attempt under `key` and admit or reject it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RateLimited { retry_after }` when the
    /// window already holds `max_attempts` attempts; `retry_after` is
    /// the remaining window.
    fn admit(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
