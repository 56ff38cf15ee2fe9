//! Federated identity-token verification.
//!
//! Google and Apple clients present an identity token obtained from the
//! provider; this module extracts the stable subject identifier and
//! profile hints from it. The [`FederatedTokenVerifier`] trait is the
//! seam where a production deployment plugs in full JWS signature
//! verification against the provider's published key set; the
//! implementations shipped here check structure, issuer, audience, and
//! expiry only, which is sufficient for the behavioral contract but not
//! for production trust (recorded as an open gap in DESIGN.md).

use crate::error::{AuthError, Result};
use crate::state::Provider;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Stable external identity extracted from a verified identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    /// Which provider issued the token.
    pub provider: Provider,

    /// Provider-scoped stable subject identifier.
    pub subject: String,

    /// Email claim, when present.
    pub email: Option<String>,

    /// Whether the provider asserts the email as verified.
    pub email_verified: bool,

    /// Display name claim, when present.
    pub name: Option<String>,

    /// Picture URL claim, when present.
    pub picture: Option<String>,
}

/// Verifier for one provider's identity tokens.
///
/// Async-shaped because a signature-verifying implementation fetches
/// the provider's key set over the network.
pub trait FederatedTokenVerifier: Send + Sync {
    /// Validate a presented identity token and extract the identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredential` if the token is
    /// structurally malformed, expired, or not issued by the expected
    /// provider for this application.
    fn verify_identity_token(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<FederatedIdentity>> + Send;
}

/// Decode the payload segment of a compact JWS without verifying the
/// signature.
fn decode_payload(token: &str) -> Result<serde_json::Value> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::InvalidCredential);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::InvalidCredential)?;

    serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidCredential)
}

/// Shared claim checks and extraction for both providers.
fn extract_identity(
    provider: Provider,
    claims: &serde_json::Value,
    allowed_issuers: &[&str],
    audience: Option<&str>,
) -> Result<FederatedIdentity> {
    let issuer = claims.get("iss").and_then(serde_json::Value::as_str);
    if !issuer.is_some_and(|iss| allowed_issuers.contains(&iss)) {
        tracing::debug!(provider = provider.as_str(), issuer, "Rejected identity token issuer");
        return Err(AuthError::InvalidCredential);
    }

    if let Some(expected) = audience {
        let aud_matches = match claims.get("aud") {
            Some(serde_json::Value::String(aud)) => aud == expected,
            Some(serde_json::Value::Array(auds)) => {
                auds.iter().any(|a| a.as_str() == Some(expected))
            }
            _ => false,
        };
        if !aud_matches {
            tracing::debug!(provider = provider.as_str(), "Rejected identity token audience");
            return Err(AuthError::InvalidCredential);
        }
    }

    let exp = claims
        .get("exp")
        .and_then(serde_json::Value::as_i64)
        .ok_or(AuthError::InvalidCredential)?;
    if exp < chrono::Utc::now().timestamp() {
        return Err(AuthError::InvalidCredential);
    }

    let subject = claims
        .get("sub")
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::InvalidCredential)?
        .to_string();

    // Apple serializes email_verified as the string "true"/"false";
    // Google uses a JSON boolean. Accept both.
    let email_verified = match claims.get("email_verified") {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => s == "true",
        _ => false,
    };

    let as_owned = |key: &str| {
        claims
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string)
    };

    Ok(FederatedIdentity {
        provider,
        subject,
        email: as_owned("email"),
        email_verified,
        name: as_owned("name"),
        picture: as_owned("picture"),
    })
}

/// Google identity-token verifier.
///
/// # Example
///
/// ```no_run
/// use tradepost_auth::providers::GoogleTokenVerifier;
///
/// let google = GoogleTokenVerifier::new()
///     .with_audience("my-client-id.apps.googleusercontent.com".to_string());
/// ```
#[derive(Debug, Clone, Default)]
pub struct GoogleTokenVerifier {
    /// Expected `aud` claim (the OAuth client id). Unset skips the check.
    audience: Option<String>,
}

impl GoogleTokenVerifier {
    /// Create a new Google verifier.
    #[must_use]
    pub const fn new() -> Self {
        Self { audience: None }
    }

    /// Require the token's audience to match this client id.
    #[must_use]
    pub fn with_audience(mut self, audience: String) -> Self {
        self.audience = Some(audience);
        self
    }
}

impl FederatedTokenVerifier for GoogleTokenVerifier {
    async fn verify_identity_token(&self, token: &str) -> Result<FederatedIdentity> {
        let claims = decode_payload(token)?;
        extract_identity(
            Provider::Google,
            &claims,
            &["https://accounts.google.com", "accounts.google.com"],
            self.audience.as_deref(),
        )
    }
}

/// Apple identity-token verifier.
#[derive(Debug, Clone, Default)]
pub struct AppleTokenVerifier {
    /// Expected `aud` claim (the app's bundle id). Unset skips the check.
    audience: Option<String>,
}

impl AppleTokenVerifier {
    /// Create a new Apple verifier.
    #[must_use]
    pub const fn new() -> Self {
        Self { audience: None }
    }

    /// Require the token's audience to match this bundle id.
    #[must_use]
    pub fn with_audience(mut self, audience: String) -> Self {
        self.audience = Some(audience);
        self
    }
}

impl FederatedTokenVerifier for AppleTokenVerifier {
    async fn verify_identity_token(&self, token: &str) -> Result<FederatedIdentity> {
        let claims = decode_payload(token)?;
        extract_identity(
            Provider::Apple,
            &claims,
            &["https://appleid.apple.com"],
            self.audience.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    /// Build an unsigned test token with the given payload claims.
    fn token_with(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{header}.{payload}.sig")
    }

    fn google_claims() -> serde_json::Value {
        serde_json::json!({
            "iss": "https://accounts.google.com",
            "sub": "1092384756",
            "aud": "client-123",
            "email": "user@example.com",
            "email_verified": true,
            "name": "Test User",
            "picture": "https://lh3.example.com/photo.jpg",
            "exp": chrono::Utc::now().timestamp() + 3600,
        })
    }

    #[tokio::test]
    async fn test_google_token_extraction() {
        let verifier = GoogleTokenVerifier::new();
        let identity = verifier
            .verify_identity_token(&token_with(&google_claims()))
            .await
            .unwrap();

        assert_eq!(identity.provider, Provider::Google);
        assert_eq!(identity.subject, "1092384756");
        assert_eq!(identity.email.as_deref(), Some("user@example.com"));
        assert!(identity.email_verified);
        assert_eq!(identity.name.as_deref(), Some("Test User"));
    }

    #[tokio::test]
    async fn test_audience_enforced_when_configured() {
        let verifier = GoogleTokenVerifier::new().with_audience("client-123".to_string());
        assert!(verifier
            .verify_identity_token(&token_with(&google_claims()))
            .await
            .is_ok());

        let strict = GoogleTokenVerifier::new().with_audience("someone-else".to_string());
        assert_eq!(
            strict.verify_identity_token(&token_with(&google_claims())).await,
            Err(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_wrong_issuer_rejected() {
        let mut claims = google_claims();
        claims["iss"] = serde_json::json!("https://evil.example.com");

        let verifier = GoogleTokenVerifier::new();
        assert_eq!(
            verifier.verify_identity_token(&token_with(&claims)).await,
            Err(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let mut claims = google_claims();
        claims["exp"] = serde_json::json!(chrono::Utc::now().timestamp() - 60);

        let verifier = GoogleTokenVerifier::new();
        assert_eq!(
            verifier.verify_identity_token(&token_with(&claims)).await,
            Err(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_malformed_tokens_rejected() {
        let verifier = GoogleTokenVerifier::new();

        for bad in ["", "only-one-segment", "a.b", "a.b.c.d", "a.!!!notbase64!!!.c"] {
            assert_eq!(
                verifier.verify_identity_token(bad).await,
                Err(AuthError::InvalidCredential),
                "should reject {bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_apple_string_email_verified() {
        let claims = serde_json::json!({
            "iss": "https://appleid.apple.com",
            "sub": "000123.abc456",
            "email": "user@privaterelay.appleid.com",
            "email_verified": "true",
            "exp": chrono::Utc::now().timestamp() + 3600,
        });

        let verifier = AppleTokenVerifier::new();
        let identity = verifier
            .verify_identity_token(&token_with(&claims))
            .await
            .unwrap();

        assert_eq!(identity.provider, Provider::Apple);
        assert!(identity.email_verified);
        assert_eq!(identity.name, None);
    }

    #[tokio::test]
    async fn test_missing_subject_rejected() {
        let mut claims = google_claims();
        claims.as_object_mut().unwrap().remove("sub");

        let verifier = GoogleTokenVerifier::new();
        assert_eq!(
            verifier.verify_identity_token(&token_with(&claims)).await,
            Err(AuthError::InvalidCredential)
        );
    }
}
