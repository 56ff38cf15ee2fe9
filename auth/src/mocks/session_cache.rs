//! Mock session validity cache for testing.

use crate::error::{AuthError, Result};
use crate::providers::SessionCache;
use crate::state::{AccountId, SessionId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Mock session validity cache.
///
/// Uses in-memory storage with real expiry semantics. A write-failure
/// toggle lets tests exercise the log-and-continue contract callers
/// apply to cache writes.
#[derive(Debug, Clone, Default)]
pub struct MockSessionCache {
    entries: Arc<Mutex<HashMap<SessionId, (AccountId, DateTime<Utc>)>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockSessionCache {
    /// Create a new mock session cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail, simulating an unhealthy fast store.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Drop every entry, simulating eviction or a cache restart.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn clear(&self) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
            .clear();
        Ok(())
    }

    /// Whether an unexpired entry exists (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn contains(&self, session_id: SessionId) -> Result<bool> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
            .get(&session_id)
            .is_some_and(|(_, expires)| *expires > Utc::now()))
    }
}

impl SessionCache for MockSessionCache {
    fn put(
        &self,
        session_id: SessionId,
        account_id: AccountId,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send {
        let entries = Arc::clone(&self.entries);
        let fail = self.fail_writes.load(Ordering::SeqCst);

        async move {
            if fail {
                return Err(AuthError::CacheError("Simulated write failure".to_string()));
            }

            entries
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
                .insert(session_id, (account_id, Utc::now() + ttl));
            Ok(())
        }
    }

    fn get(&self, session_id: SessionId) -> impl Future<Output = Result<Option<AccountId>>> + Send {
        let entries = Arc::clone(&self.entries);

        async move {
            let mut guard = entries
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;

            match guard.get(&session_id).copied() {
                Some((account_id, expires)) if expires > Utc::now() => Ok(Some(account_id)),
                Some(_) => {
                    // TTL ran out; Redis would have evicted the key.
                    guard.remove(&session_id);
                    Ok(None)
                }
                None => Ok(None),
            }
        }
    }

    fn remove(&self, session_id: SessionId) -> impl Future<Output = Result<()>> + Send {
        let entries = Arc::clone(&self.entries);
        let fail = self.fail_writes.load(Ordering::SeqCst);

        async move {
            if fail {
                return Err(AuthError::CacheError("Simulated write failure".to_string()));
            }

            entries
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
                .remove(&session_id);
            Ok(())
        }
    }

    fn remove_many(&self, session_ids: &[SessionId]) -> impl Future<Output = Result<()>> + Send {
        let entries = Arc::clone(&self.entries);
        let fail = self.fail_writes.load(Ordering::SeqCst);
        let session_ids = session_ids.to_vec();

        async move {
            if fail {
                return Err(AuthError::CacheError("Simulated write failure".to_string()));
            }

            let mut guard = entries
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;
            for id in session_ids {
                guard.remove(&id);
            }
            Ok(())
        }
    }
}
