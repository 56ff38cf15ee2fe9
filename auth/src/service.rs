//! Authentication service facade.
//!
//! The narrow interface the transport layer consumes. Bundles the
//! phone verifier, the federated verifiers, the identity resolver, and
//! the session manager behind the operations of the auth API. Every
//! dependency is injected at construction; the process entry point
//! owns store lifecycle and passes handles down.

use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::phone::PhoneVerifier;
use crate::providers::{
    AccountRepository, ChallengeStore, FederatedIdentity, FederatedTokenVerifier, RateGuard,
    SessionCache, SessionRepository,
};
use crate::sessions::SessionManager;
use crate::state::{Authenticated, AuthResult, ProfileHints, Provider, SessionId, TokenPair};
use std::net::IpAddr;

/// Authentication service.
///
/// # Type Parameters
///
/// - `A`: account repository (durable)
/// - `S`: session repository (durable)
/// - `C`: session validity cache (fast store)
/// - `Ch`: challenge store (fast store)
/// - `R`: rate guard (fast store)
/// - `G`: Google identity-token verifier
/// - `Ap`: Apple identity-token verifier
#[derive(Clone)]
pub struct AuthService<A, S, C, Ch, R, G, Ap>
where
    A: AccountRepository,
    S: SessionRepository,
    C: SessionCache,
    Ch: ChallengeStore,
    R: RateGuard,
    G: FederatedTokenVerifier,
    Ap: FederatedTokenVerifier,
{
    phone: PhoneVerifier<Ch, R>,
    google: G,
    apple: Ap,
    identity: IdentityResolver<A>,
    sessions: SessionManager<S, C>,
}

impl<A, S, C, Ch, R, G, Ap> AuthService<A, S, C, Ch, R, G, Ap>
where
    A: AccountRepository,
    S: SessionRepository,
    C: SessionCache,
    Ch: ChallengeStore,
    R: RateGuard,
    G: FederatedTokenVerifier,
    Ap: FederatedTokenVerifier,
{
    /// Assemble the service from its components.
    pub const fn new(
        phone: PhoneVerifier<Ch, R>,
        google: G,
        apple: Ap,
        identity: IdentityResolver<A>,
        sessions: SessionManager<S, C>,
    ) -> Self {
        Self {
            phone,
            google,
            apple,
            identity,
            sessions,
        }
    }

    /// The session manager, for collaborators that only need the
    /// session surface (validity checks, revocation sweeps).
    #[must_use]
    pub const fn sessions(&self) -> &SessionManager<S, C> {
        &self.sessions
    }

    /// Generate and store a verification code for a phone number.
    ///
    /// Delivery is an external collaborator's job; the code is handed
    /// back for it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RateLimited` past the per-phone send limit;
    /// propagates store failures.
    pub async fn send_verification_code(&self, phone: &str) -> Result<String> {
        self.phone.request_code(phone).await
    }

    /// Authenticate with a phone number and one-time code.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The attempt limit is exhausted → `AuthError::RateLimited`
    /// - The code is wrong or expired → `AuthError::InvalidCredential`
    /// - A store request fails
    pub async fn verify_phone_code(
        &self,
        phone: &str,
        code: &str,
        device_type: Option<String>,
        ip: IpAddr,
    ) -> Result<AuthResult> {
        self.phone.verify_code(phone, code).await?;

        let (account, is_new_account) = self
            .identity
            .resolve(Provider::Phone, phone, &ProfileHints::default())
            .await?;

        let tokens = self
            .sessions
            .create_session(account.account_id, device_type, ip)
            .await?;

        Ok(AuthResult {
            account,
            is_new_account,
            tokens,
        })
    }

    /// Authenticate with a Google identity token.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The token is malformed or not Google's → `AuthError::InvalidCredential`
    /// - Linking collides → `AuthError::AccountConflict`
    /// - A store request fails
    pub async fn authenticate_with_google(
        &self,
        id_token: &str,
        device_type: Option<String>,
        ip: IpAddr,
    ) -> Result<AuthResult> {
        let identity = self.google.verify_identity_token(id_token).await?;
        self.login_federated(identity, device_type, ip).await
    }

    /// Authenticate with an Apple identity token.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The token is malformed or not Apple's → `AuthError::InvalidCredential`
    /// - Linking collides → `AuthError::AccountConflict`
    /// - A store request fails
    pub async fn authenticate_with_apple(
        &self,
        identity_token: &str,
        device_type: Option<String>,
        ip: IpAddr,
    ) -> Result<AuthResult> {
        let identity = self.apple.verify_identity_token(identity_token).await?;
        self.login_federated(identity, device_type, ip).await
    }

    /// Rotate a refresh token into a fresh pair.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The token is invalid or expired → `AuthError::InvalidRefreshToken`
    /// - Reuse is detected → `AuthError::SessionCompromised` (all of
    ///   the account's sessions are gone)
    /// - A store request fails
    pub async fn refresh(&self, refresh_token: &str, ip: IpAddr) -> Result<TokenPair> {
        self.sessions.rotate(refresh_token, ip).await
    }

    /// Log a session out. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns error if the durable store request fails.
    pub async fn logout(&self, session_id: SessionId) -> Result<()> {
        self.sessions.revoke(session_id).await
    }

    /// Gate for protected operations elsewhere in the system.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` if the access token or its
    /// session is invalid; propagates durable store failures.
    pub async fn authenticate(&self, access_token: &str) -> Result<Authenticated> {
        self.sessions.authenticate(access_token).await
    }

    async fn login_federated(
        &self,
        identity: FederatedIdentity,
        device_type: Option<String>,
        ip: IpAddr,
    ) -> Result<AuthResult> {
        let hints = ProfileHints {
            email: identity.email.clone(),
            name: identity.name.clone(),
            picture: identity.picture.clone(),
        };

        let (account, is_new_account) = self
            .identity
            .resolve(identity.provider, &identity.subject, &hints)
            .await?;

        let tokens = self
            .sessions
            .create_session(account.account_id, device_type, ip)
            .await?;

        Ok(AuthResult {
            account,
            is_new_account,
            tokens,
        })
    }
}
