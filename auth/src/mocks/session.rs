//! Mock session repository for testing.

use crate::error::{AuthError, Result};
use crate::state::{AccountId, NewSession, Session, SessionId};
use crate::providers::SessionRepository;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

/// Mock session repository.
///
/// Uses in-memory storage. The compare-and-swap rotation runs under
/// the store mutex, giving the same exactly-one-winner guarantee the
/// Postgres conditional `UPDATE` provides.
#[derive(Debug, Clone, Default)]
pub struct MockSessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
}

impl MockSessionRepository {
    /// Create a new mock session repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get count of stored sessions (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn session_count(&self) -> Result<usize> {
        Ok(self
            .sessions
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
            .len())
    }

    /// Get count of sessions belonging to an account (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn account_session_count(&self, account_id: AccountId) -> Result<usize> {
        Ok(self
            .sessions
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
            .values()
            .filter(|s| s.account_id == account_id)
            .count())
    }
}

impl SessionRepository for MockSessionRepository {
    fn create_session(
        &self,
        new_session: &NewSession,
    ) -> impl Future<Output = Result<Session>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let new_session = new_session.clone();

        async move {
            let session = Session {
                session_id: SessionId::new(),
                account_id: new_session.account_id,
                refresh_token_hash: String::new(),
                device_type: new_session.device_type,
                ip_address: new_session.ip_address,
                created_at: Utc::now(),
                expires_at: new_session.expires_at,
            };

            sessions
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
                .insert(session.session_id, session.clone());

            Ok(session)
        }
    }

    fn find_session(
        &self,
        session_id: SessionId,
    ) -> impl Future<Output = Result<Option<Session>>> + Send {
        let sessions = Arc::clone(&self.sessions);

        async move {
            let guard = sessions
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;
            Ok(guard.get(&session_id).cloned())
        }
    }

    fn set_refresh_hash(
        &self,
        session_id: SessionId,
        refresh_token_hash: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let refresh_token_hash = refresh_token_hash.to_string();

        async move {
            let mut guard = sessions
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;

            let session = guard
                .get_mut(&session_id)
                .ok_or(AuthError::SessionNotFound)?;
            session.refresh_token_hash = refresh_token_hash;
            Ok(())
        }
    }

    fn rotate_refresh_hash(
        &self,
        session_id: SessionId,
        expected_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
        new_ip: IpAddr,
    ) -> impl Future<Output = Result<bool>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let expected_hash = expected_hash.to_string();
        let new_hash = new_hash.to_string();

        async move {
            let mut guard = sessions
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;

            let Some(session) = guard.get_mut(&session_id) else {
                return Ok(false);
            };

            if session.refresh_token_hash != expected_hash {
                return Ok(false);
            }

            session.refresh_token_hash = new_hash;
            session.expires_at = new_expires_at;
            session.ip_address = new_ip;
            Ok(true)
        }
    }

    fn delete_session(&self, session_id: SessionId) -> impl Future<Output = Result<()>> + Send {
        let sessions = Arc::clone(&self.sessions);

        async move {
            sessions
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
                .remove(&session_id);
            Ok(())
        }
    }

    fn delete_account_sessions(
        &self,
        account_id: AccountId,
    ) -> impl Future<Output = Result<Vec<SessionId>>> + Send {
        let sessions = Arc::clone(&self.sessions);

        async move {
            let mut guard = sessions
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;

            let ids: Vec<SessionId> = guard
                .values()
                .filter(|s| s.account_id == account_id)
                .map(|s| s.session_id)
                .collect();

            for id in &ids {
                guard.remove(id);
            }

            Ok(ids)
        }
    }

    fn list_account_sessions(
        &self,
        account_id: AccountId,
    ) -> impl Future<Output = Result<Vec<Session>>> + Send {
        let sessions = Arc::clone(&self.sessions);

        async move {
            let guard = sessions
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;

            let mut list: Vec<Session> = guard
                .values()
                .filter(|s| s.account_id == account_id)
                .cloned()
                .collect();
            list.sort_by_key(|s| (s.created_at, s.session_id.0));

            Ok(list)
        }
    }
}
