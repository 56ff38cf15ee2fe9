//! Mock challenge store for testing.

use crate::error::{AuthError, Result};
use crate::providers::{ChallengeStore, CodeCheck};
use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Mock challenge store.
///
/// Uses in-memory storage with real expiry semantics; consumption is
/// atomic under the store mutex.
#[derive(Debug, Clone, Default)]
pub struct MockChallengeStore {
    codes: Arc<Mutex<HashMap<String, (String, DateTime<Utc>)>>>,
}

impl MockChallengeStore {
    /// Create a new mock challenge store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently stored, unexpired code for a phone. Stands in for
    /// the SMS delivery collaborator in tests.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn stored_code(&self, phone: &str) -> Result<Option<String>> {
        Ok(self
            .codes
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
            .get(phone)
            .filter(|(_, expires)| *expires > Utc::now())
            .map(|(code, _)| code.clone()))
    }

    /// Force-expire any stored code for a phone (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn expire_code(&self, phone: &str) -> Result<()> {
        if let Some(entry) = self
            .codes
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
            .get_mut(phone)
        {
            entry.1 = Utc::now() - Duration::seconds(1);
        }
        Ok(())
    }
}

impl ChallengeStore for MockChallengeStore {
    fn put_code(
        &self,
        phone: &str,
        code: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send {
        let codes = Arc::clone(&self.codes);
        let phone = phone.to_string();
        let code = code.to_string();

        async move {
            codes
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
                .insert(phone, (code, Utc::now() + ttl));
            Ok(())
        }
    }

    fn consume_if_match(
        &self,
        phone: &str,
        code: &str,
    ) -> impl Future<Output = Result<CodeCheck>> + Send {
        let codes = Arc::clone(&self.codes);
        let phone = phone.to_string();
        let code = code.to_string();

        async move {
            let mut guard = codes
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;

            let Some((stored, expires)) = guard.get(&phone).map(|(c, e)| (c.clone(), *e)) else {
                return Ok(CodeCheck::Missing);
            };

            if expires <= Utc::now() {
                guard.remove(&phone);
                return Ok(CodeCheck::Missing);
            }

            if constant_time_eq(stored.as_bytes(), code.as_bytes()) {
                guard.remove(&phone);
                Ok(CodeCheck::Matched)
            } else {
                Ok(CodeCheck::Mismatch)
            }
        }
    }
}
