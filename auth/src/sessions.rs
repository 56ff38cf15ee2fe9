//! Session lifecycle management.
//!
//! The core state machine of the subsystem. A session is *Active*
//! while its durable record exists, is unexpired, and holds the digest
//! of the most recently issued refresh token; it becomes *Rotated-away*
//! the moment a rotation overwrites that digest, *Revoked* when the
//! record is deleted, and *Expired* records are treated as revoked on
//! next access.
//!
//! All session state lives in the two injected stores; this component
//! holds nothing mutable beyond configuration, so correctness is a
//! property of store operations rather than in-process locking. The
//! rotation commit is a compare-and-swap on the stored digest: of two
//! concurrent rotations presenting the same token, exactly one wins
//! and the loser is handled as a reuse event.

use crate::config::SessionConfig;
use crate::error::{AuthError, Result};
use crate::providers::{SessionCache, SessionRepository};
use crate::state::{AccountId, Authenticated, NewSession, SessionId, TokenPair};
use crate::tokens::{TokenCodec, TokenKind};
use chrono::Utc;
use constant_time_eq::constant_time_eq;
use std::net::IpAddr;

/// Session lifecycle manager over a durable repository and a validity
/// cache.
#[derive(Clone)]
pub struct SessionManager<S, C>
where
    S: SessionRepository,
    C: SessionCache,
{
    sessions: S,
    cache: C,
    codec: TokenCodec,
    config: SessionConfig,
}

impl<S, C> SessionManager<S, C>
where
    S: SessionRepository,
    C: SessionCache,
{
    /// Create a session manager over the given stores.
    pub const fn new(sessions: S, cache: C, codec: TokenCodec, config: SessionConfig) -> Self {
        Self {
            sessions,
            cache,
            codec,
            config,
        }
    }

    /// The codec used for issuing and verifying token pairs.
    #[must_use]
    pub const fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create a session for an authenticated account and issue its
    /// first token pair.
    ///
    /// The durable record is allocated first so the session id exists
    /// before tokens embed it; the refresh digest is written once the
    /// pair is issued. Creating a session beyond the per-account cap
    /// evicts the oldest sessions by creation time from both stores.
    ///
    /// # Errors
    ///
    /// Returns error if the durable store request fails or signing
    /// fails. Cache write failures are logged and swallowed.
    pub async fn create_session(
        &self,
        account_id: AccountId,
        device_type: Option<String>,
        ip: IpAddr,
    ) -> Result<TokenPair> {
        let expires_at = Utc::now() + self.codec.refresh_ttl();

        let session = self
            .sessions
            .create_session(&NewSession {
                account_id,
                device_type,
                ip_address: ip,
                expires_at,
            })
            .await?;

        let access_token = self.codec.issue_access(account_id, session.session_id)?;
        let refresh_token = self.codec.issue_refresh(account_id, session.session_id)?;

        self.sessions
            .set_refresh_hash(session.session_id, &TokenCodec::hash(&refresh_token))
            .await?;

        self.cache_put_logged(session.session_id, account_id, self.codec.refresh_ttl())
            .await;

        self.enforce_session_cap(account_id).await?;

        tracing::info!(
            account_id = %account_id.0,
            session_id = %session.session_id.0,
            "Created session"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.codec.access_expires_in(),
        })
    }

    /// Rotate a refresh token: verify it, detect reuse, and issue a
    /// fresh pair.
    ///
    /// A refresh token is single-use. Presenting a token whose digest
    /// no longer matches the stored one, or whose session record is
    /// gone, is proof that an old copy is being replayed: the
    /// legitimate holder has already rotated past it, so every session
    /// of the account is revoked.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The token fails signature/structure/expiry checks → `AuthError::InvalidRefreshToken`
    /// - Reuse is detected → `AuthError::SessionCompromised`
    /// - The durable store request fails
    pub async fn rotate(&self, presented_refresh: &str, ip: IpAddr) -> Result<TokenPair> {
        let claims = self.codec.verify(presented_refresh, TokenKind::Refresh)?;

        let Some(session) = self.sessions.find_session(claims.session_id).await? else {
            return self.reuse_detected(claims.account_id, claims.session_id).await;
        };

        if session.expires_at < Utc::now() {
            // Expired is treated as revoked on next access.
            self.sessions.delete_session(session.session_id).await?;
            self.cache_remove_logged(session.session_id).await;
            return self.reuse_detected(claims.account_id, claims.session_id).await;
        }

        let presented_hash = TokenCodec::hash(presented_refresh);
        if !constant_time_eq(
            session.refresh_token_hash.as_bytes(),
            presented_hash.as_bytes(),
        ) {
            return self.reuse_detected(session.account_id, session.session_id).await;
        }

        let access_token = self.codec.issue_access(session.account_id, session.session_id)?;
        let refresh_token = self.codec.issue_refresh(session.account_id, session.session_id)?;
        let new_expires_at = Utc::now() + self.codec.refresh_ttl();

        let swapped = self
            .sessions
            .rotate_refresh_hash(
                session.session_id,
                &presented_hash,
                &TokenCodec::hash(&refresh_token),
                new_expires_at,
                ip,
            )
            .await?;

        if !swapped {
            // A concurrent rotation committed first; this presentation
            // is now a replay of a superseded token.
            return self.reuse_detected(session.account_id, session.session_id).await;
        }

        self.cache_put_logged(session.session_id, session.account_id, self.codec.refresh_ttl())
            .await;

        tracing::info!(
            account_id = %session.account_id.0,
            session_id = %session.session_id.0,
            "Rotated refresh token"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.codec.access_expires_in(),
        })
    }

    /// Revoke a single session (logout). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns error if the durable store request fails. Cache
    /// failures are logged and swallowed.
    pub async fn revoke(&self, session_id: SessionId) -> Result<()> {
        self.sessions.delete_session(session_id).await?;
        self.cache_remove_logged(session_id).await;

        tracing::info!(session_id = %session_id.0, "Revoked session");

        Ok(())
    }

    /// Whether a session is currently valid.
    ///
    /// Cache-first: a present entry is authoritative. On a miss the
    /// durable record decides; a valid record repopulates the cache
    /// with its remaining lifetime, and an expired record is deleted
    /// lazily. A cache *read* failure falls back to the durable store.
    ///
    /// # Errors
    ///
    /// Returns error if the durable store request fails.
    pub async fn is_valid(&self, session_id: SessionId) -> Result<bool> {
        match self.cache.get(session_id).await {
            Ok(Some(_)) => return Ok(true),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id.0,
                    error = %e,
                    "Session cache read failed, falling back to durable store"
                );
            }
        }

        let Some(session) = self.sessions.find_session(session_id).await? else {
            return Ok(false);
        };

        let remaining = session.expires_at.signed_duration_since(Utc::now());
        if remaining <= chrono::Duration::zero() {
            self.sessions.delete_session(session_id).await?;
            self.cache_remove_logged(session_id).await;
            return Ok(false);
        }

        self.cache_put_logged(session_id, session.account_id, remaining)
            .await;

        Ok(true)
    }

    /// Gate for protected operations: verify an access token and check
    /// that its session is still valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` if the token or its session
    /// is invalid; propagates durable store failures.
    pub async fn authenticate(&self, access_token: &str) -> Result<Authenticated> {
        let claims = self.codec.verify(access_token, TokenKind::Access)?;

        if !self.is_valid(claims.session_id).await? {
            return Err(AuthError::Unauthorized);
        }

        Ok(Authenticated {
            account_id: claims.account_id,
            session_id: claims.session_id,
        })
    }

    /// Cascade revocation after a reuse event: every session of the
    /// account is removed from both stores.
    async fn reuse_detected(
        &self,
        account_id: AccountId,
        session_id: SessionId,
    ) -> Result<TokenPair> {
        tracing::warn!(
            account_id = %account_id.0,
            session_id = %session_id.0,
            "Refresh token reuse detected, revoking all account sessions"
        );

        let deleted = self.sessions.delete_account_sessions(account_id).await?;
        if let Err(e) = self.cache.remove_many(&deleted).await {
            tracing::warn!(
                account_id = %account_id.0,
                error = %e,
                "Failed to purge cache entries after reuse detection"
            );
        }

        Err(AuthError::SessionCompromised)
    }

    /// Delete oldest-by-creation sessions beyond the per-account cap.
    async fn enforce_session_cap(&self, account_id: AccountId) -> Result<()> {
        let sessions = self.sessions.list_account_sessions(account_id).await?;
        if sessions.len() <= self.config.max_sessions_per_account {
            return Ok(());
        }

        let excess = sessions.len() - self.config.max_sessions_per_account;
        for session in sessions.into_iter().take(excess) {
            self.sessions.delete_session(session.session_id).await?;
            self.cache_remove_logged(session.session_id).await;

            tracing::info!(
                account_id = %account_id.0,
                session_id = %session.session_id.0,
                "Evicted session over per-account cap"
            );
        }

        Ok(())
    }

    async fn cache_put_logged(
        &self,
        session_id: SessionId,
        account_id: AccountId,
        ttl: chrono::Duration,
    ) {
        if let Err(e) = self.cache.put(session_id, account_id, ttl).await {
            tracing::warn!(
                session_id = %session_id.0,
                error = %e,
                "Session cache write failed (durable store remains authoritative)"
            );
        }
    }

    async fn cache_remove_logged(&self, session_id: SessionId) {
        if let Err(e) = self.cache.remove(session_id).await {
            tracing::warn!(
                session_id = %session_id.0,
                error = %e,
                "Session cache delete failed (entry expires with its TTL)"
            );
        }
    }
}
