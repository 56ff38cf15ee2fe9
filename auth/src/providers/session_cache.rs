//! Session validity cache trait.

use crate::error::Result;
use crate::state::{AccountId, SessionId};
use chrono::Duration;

/// Fast-lookup projection of "is session X currently valid".
///
/// Keyed by session id; the value is the owning account id; the TTL
/// mirrors the session's remaining durable lifetime. A present entry is
/// authoritative for validity. A **miss proves nothing**: the durable
/// record is consulted and, when valid, the entry is repopulated.
///
/// Write failures are tolerated by callers (logged and swallowed): the
/// durable store remains authoritative on the next miss.
pub trait SessionCache: Send + Sync {
    /// Write or refresh the entry for a session.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn put(
        &self,
        session_id: SessionId,
        account_id: AccountId,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Look up a session's owning account.
    ///
    /// # Returns
    ///
    /// `Some(account_id)` when the entry is present (session valid),
    /// `None` on a miss (not authoritative).
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn get(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<Option<AccountId>>> + Send;

    /// Remove the entry for a session (idempotent).
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn remove(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Remove many entries in one round trip (bulk revocation).
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn remove_many(
        &self,
        session_ids: &[SessionId],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
