//! Stateless access/refresh token codec.
//!
//! Signs and verifies compact HS256 tokens carrying the owning account
//! and session ids. Access and refresh tokens use disjoint secrets and
//! disjoint lifetimes, so a leaked access token can never be replayed
//! against the refresh path. No I/O; verification is a pure function
//! of the token, the secrets, and the clock. Issuance stamps a random
//! `jti` so consecutive tokens for the same session never collide.

use crate::config::TokenConfig;
use crate::error::{AuthError, Result};
use crate::state::{AccountId, SessionId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which of the two credential kinds a token claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Short-lived credential for ordinary requests.
    Access,
    /// Long-lived, single-use-per-rotation credential.
    Refresh,
}

impl TokenKind {
    /// Get the kind as a string (for logging).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Claims embedded in every issued token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject: account id.
    sub: String,
    /// Session id the token belongs to.
    sid: String,
    /// Issued-at timestamp.
    iat: i64,
    /// Expiration timestamp.
    exp: i64,
    /// Issuer.
    iss: String,
    /// Unique token identifier. Keeps back-to-back issuances distinct
    /// even within one clock second, so a rotated pair never collides
    /// with its predecessor.
    jti: String,
}

/// Identity extracted from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    /// Account the token was issued to.
    pub account_id: AccountId,

    /// Session the token belongs to.
    pub session_id: SessionId,
}

/// Token codec holding both key pairs.
#[derive(Clone)]
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    issuer: String,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl TokenCodec {
    /// Create a codec from token configuration.
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    /// Issue an access token for the given account and session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InternalError` if signing fails.
    pub fn issue_access(&self, account_id: AccountId, session_id: SessionId) -> Result<String> {
        self.issue(TokenKind::Access, account_id, session_id)
    }

    /// Issue a refresh token for the given account and session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InternalError` if signing fails.
    pub fn issue_refresh(&self, account_id: AccountId, session_id: SessionId) -> Result<String> {
        self.issue(TokenKind::Refresh, account_id, session_id)
    }

    fn issue(&self, kind: TokenKind, account_id: AccountId, session_id: SessionId) -> Result<String> {
        let now = chrono::Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: account_id.0.to_string(),
            sid: session_id.0.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let key = match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        };

        encode(&Header::default(), &claims, key)
            .map_err(|e| AuthError::InternalError(format!("Failed to sign {} token: {e}", kind.as_str())))
    }

    /// Verify a token of the given kind and extract its identity.
    ///
    /// Validates signature, structure, expiry, and issuer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRefreshToken` for a failed refresh
    /// token and `AuthError::Unauthorized` for a failed access token.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims> {
        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        let rejection = || match kind {
            TokenKind::Access => AuthError::Unauthorized,
            TokenKind::Refresh => AuthError::InvalidRefreshToken,
        };

        let data = decode::<Claims>(token, key, &validation).map_err(|e| {
            tracing::debug!(kind = kind.as_str(), error = %e, "Token verification failed");
            rejection()
        })?;

        let account_id = data
            .claims
            .sub
            .parse::<uuid::Uuid>()
            .map_err(|_| rejection())?;
        let session_id = data
            .claims
            .sid
            .parse::<uuid::Uuid>()
            .map_err(|_| rejection())?;

        Ok(TokenClaims {
            account_id: AccountId(account_id),
            session_id: SessionId(session_id),
        })
    }

    /// One-way digest of a token, hex-encoded SHA-256.
    ///
    /// Used to compare presented refresh tokens against the stored
    /// digest; the raw refresh token is never persisted.
    #[must_use]
    pub fn hash(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Access token lifetime in seconds, as returned to clients.
    #[must_use]
    pub const fn access_expires_in(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Refresh token (and session) lifetime.
    #[must_use]
    pub const fn refresh_ttl(&self) -> chrono::Duration {
        self.refresh_ttl
    }
}
