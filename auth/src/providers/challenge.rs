//! Phone verification challenge store trait.

use crate::error::Result;
use chrono::Duration;

/// Outcome of a compare-and-consume attempt on a stored code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    /// The presented code matched; the challenge has been deleted.
    Matched,
    /// A challenge exists but the presented code differs. The
    /// challenge is retained until it expires.
    Mismatch,
    /// No challenge exists for this phone (expired or never requested).
    Missing,
}

/// Ephemeral storage for phone verification codes.
///
/// Challenges live only in the fast store under a short TTL and are
/// never persisted durably. Consumption is atomic compare-and-delete:
/// a matching code is deleted in the same store operation that checks
/// it, so a code verifies successfully at most once even under
/// concurrent attempts.
pub trait ChallengeStore: Send + Sync {
    /// Store the code for a phone number, replacing any prior code.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn put_code(
        &self,
        phone: &str,
        code: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Atomically compare the presented code against the stored one,
    /// deleting the challenge on a match.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn consume_if_match(
        &self,
        phone: &str,
        code: &str,
    ) -> impl std::future::Future<Output = Result<CodeCheck>> + Send;
}
