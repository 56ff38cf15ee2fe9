//! Mock rate guard for testing.

use crate::error::{AuthError, Result};
use crate::providers::RateGuard;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock fixed-window rate guard.
///
/// Uses in-memory counters. A backend-failure toggle exercises the
/// fail-open contract: while failing, every request is admitted and
/// nothing is counted, exactly as the Redis implementation behaves
/// when its store is unhealthy.
#[derive(Debug, Clone, Default)]
pub struct MockRateGuard {
    counters: Arc<Mutex<HashMap<String, (u32, DateTime<Utc>)>>>,
    backend_failing: Arc<AtomicBool>,
}

impl MockRateGuard {
    /// Create a new mock rate guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the counter backend going down.
    pub fn set_backend_failing(&self, failing: bool) {
        self.backend_failing.store(failing, Ordering::SeqCst);
    }

    /// Current attempt count for a key (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn attempts(&self, key: &str) -> Result<u32> {
        Ok(self
            .counters
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
            .get(key)
            .map_or(0, |(count, _)| *count))
    }
}

impl RateGuard for MockRateGuard {
    fn admit(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
    ) -> impl Future<Output = Result<()>> + Send {
        let counters = Arc::clone(&self.counters);
        let failing = self.backend_failing.load(Ordering::SeqCst);
        let key = key.to_string();

        async move {
            if failing {
                tracing::warn!(key = %key, "Rate guard store failure, admitting request (fail open)");
                return Ok(());
            }

            let mut guard = counters
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;

            let now = Utc::now();
            let window_chrono = chrono::Duration::from_std(window)
                .map_err(|e| AuthError::InternalError(format!("Window out of range: {e}")))?;

            let entry = guard.entry(key).or_insert((0, now + window_chrono));

            // Fixed window: the counter resets once the window that
            // opened with its first attempt has elapsed.
            if entry.1 <= now {
                *entry = (0, now + window_chrono);
            }

            entry.0 += 1;

            if entry.0 > max_attempts {
                let retry_after = (entry.1 - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                return Err(AuthError::RateLimited { retry_after });
            }

            Ok(())
        }
    }
}
