//! Error types for authentication and session lifecycle operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Closed error taxonomy for the authentication subsystem.
///
/// Callers switch on the variant; no error carries a numeric status
/// code and no error kind is ever downgraded to success.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Admission
    // ═══════════════════════════════════════════════════════════

    /// Too many code sends or verification attempts.
    #[error("Too many attempts, retry after {retry_after:?}")]
    RateLimited {
        /// Duration to wait before retrying.
        retry_after: std::time::Duration,
    },

    // ═══════════════════════════════════════════════════════════
    // Credential Errors
    // ═══════════════════════════════════════════════════════════

    /// Wrong or expired verification code, or a malformed identity token.
    #[error("Invalid credential")]
    InvalidCredential,

    /// Refresh token failed signature, structure, or expiry checks.
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Refresh-token reuse detected; every session of the account has
    /// been revoked and the caller must authenticate from scratch.
    #[error("Session compromised: refresh token reuse detected")]
    SessionCompromised,

    /// Linking would bind an external identifier to a second account.
    #[error("Account conflict: identifier already linked")]
    AccountConflict,

    /// Access token rejected or its session is no longer valid.
    #[error("Unauthorized")]
    Unauthorized,

    // ═══════════════════════════════════════════════════════════
    // Session Errors
    // ═══════════════════════════════════════════════════════════

    /// Session not found.
    #[error("Session not found")]
    SessionNotFound,

    /// Session has passed its absolute expiry.
    #[error("Session has expired")]
    SessionExpired,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Durable store operation failed. Authentication is unavailable;
    /// the caller must not guess a result.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Fast store operation failed. Reads fall back to the durable
    /// store; writes are logged and swallowed by the callers that can
    /// tolerate them.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal invariant violation (should not be exposed to users).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Returns `true` if this error is correctable by the end user.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tradepost_auth::AuthError;
    /// assert!(AuthError::InvalidCredential.is_user_error());
    /// assert!(!AuthError::DatabaseError("down".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredential | Self::AccountConflict | Self::RateLimited { .. }
        )
    }

    /// Returns `true` if the caller must re-authenticate from scratch.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tradepost_auth::AuthError;
    /// assert!(AuthError::SessionCompromised.requires_reauth());
    /// assert!(!AuthError::InvalidCredential.requires_reauth());
    /// ```
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Self::InvalidRefreshToken
                | Self::SessionCompromised
                | Self::Unauthorized
                | Self::SessionExpired
        )
    }

    /// Returns `true` if this error indicates a possible attack.
    #[must_use]
    pub const fn is_security_event(&self) -> bool {
        matches!(self, Self::SessionCompromised | Self::RateLimited { .. })
    }
}
