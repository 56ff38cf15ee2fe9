//! Durable session repository trait.

use crate::error::Result;
use crate::state::{AccountId, NewSession, Session, SessionId};
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// Durable session storage, the source of truth for session validity.
///
/// The fast-lookup cache ([`crate::providers::SessionCache`]) is a
/// disposable projection of these records; whenever they disagree, the
/// repository wins.
pub trait SessionRepository: Send + Sync {
    /// Allocate a session record with a placeholder refresh digest.
    ///
    /// The repository mints the session id; tokens embedding it are
    /// issued afterwards and the digest written via
    /// [`set_refresh_hash`](Self::set_refresh_hash).
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn create_session(
        &self,
        new_session: &NewSession,
    ) -> impl std::future::Future<Output = Result<Session>> + Send;

    /// Find a session by id.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn find_session(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<Option<Session>>> + Send;

    /// Write the refresh digest for a freshly created session.
    ///
    /// # Errors
    ///
    /// Returns error if the session does not exist or the store
    /// request fails.
    fn set_refresh_hash(
        &self,
        session_id: SessionId,
        refresh_token_hash: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Atomically replace the refresh digest, expiry, and origin IP,
    /// but only while the stored digest still equals `expected_hash`.
    ///
    /// Single conditional write: of two concurrent rotations presenting
    /// the same still-valid token, exactly one observes `true`. The
    /// loser must be treated as a reuse event.
    ///
    /// # Returns
    ///
    /// `true` if the swap happened, `false` if the stored digest had
    /// already moved on (or the session is gone).
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn rotate_refresh_hash(
        &self,
        session_id: SessionId,
        expected_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
        new_ip: IpAddr,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Delete a session. Idempotent: deleting an absent session is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn delete_session(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete every session belonging to an account.
    ///
    /// # Returns
    ///
    /// The ids of the deleted sessions, so the caller can purge the
    /// matching cache entries.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn delete_account_sessions(
        &self,
        account_id: AccountId,
    ) -> impl std::future::Future<Output = Result<Vec<SessionId>>> + Send;

    /// List an account's sessions ordered by creation time, oldest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn list_account_sessions(
        &self,
        account_id: AccountId,
    ) -> impl std::future::Future<Output = Result<Vec<Session>>> + Send;
}
