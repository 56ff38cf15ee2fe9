//! Core state types for accounts, sessions, and issued credentials.
//!
//! All types are `Clone` and serializable so they can cross store
//! boundaries without borrowing from the component that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub uuid::Uuid);

impl AccountId {
    /// Generate a new random `AccountId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a session.
///
/// Opaque to callers; minted by the durable session repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    /// Generate a new random `SessionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Credential Paths
// ═══════════════════════════════════════════════════════════════════════

/// Credential path through which an identity was verified.
///
/// Doubles as the verification badge recorded on the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Phone number verified by one-time code.
    Phone,
    /// Google identity token.
    Google,
    /// Apple identity token.
    Apple,
}

impl Provider {
    /// Get the provider name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Google => "google",
            Self::Apple => "apple",
        }
    }

    /// Parse provider from string.
    ///
    /// # Errors
    ///
    /// Returns error if the provider string is not recognized.
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "phone" => Ok(Self::Phone),
            "google" => Ok(Self::Google),
            "apple" => Ok(Self::Apple),
            _ => Err(format!("Unknown provider: {s}")),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Account
// ═══════════════════════════════════════════════════════════════════════

/// A user identity.
///
/// Each external identifier (phone, Google subject, Apple subject) maps
/// to at most one account; the durable store backs this with unique
/// constraints. Accounts gain badges and linked identifiers over time
/// and are never deleted by this subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub account_id: AccountId,

    /// E.164 phone number, when verified via the phone path.
    pub phone: Option<String>,

    /// Email address, from a federated profile or a link.
    pub email: Option<String>,

    /// Google subject identifier.
    pub google_sub: Option<String>,

    /// Apple subject identifier.
    pub apple_sub: Option<String>,

    /// Display name, when a federated profile supplied one.
    pub name: Option<String>,

    /// Profile picture URL, when a federated profile supplied one.
    pub picture: Option<String>,

    /// Verification badges earned so far.
    pub verified: Vec<Provider>,

    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last successful authentication timestamp.
    pub last_active_at: DateTime<Utc>,
}

impl Account {
    /// Create a fresh, unbadged account.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            account_id: AccountId::new(),
            phone: None,
            email: None,
            google_sub: None,
            apple_sub: None,
            name: None,
            picture: None,
            verified: Vec::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// The external identifier recorded for `provider`, if any.
    #[must_use]
    pub fn identifier(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Phone => self.phone.as_deref(),
            Provider::Google => self.google_sub.as_deref(),
            Provider::Apple => self.apple_sub.as_deref(),
        }
    }

    /// Record the external identifier for `provider`.
    pub fn set_identifier(&mut self, provider: Provider, value: String) {
        match provider {
            Provider::Phone => self.phone = Some(value),
            Provider::Google => self.google_sub = Some(value),
            Provider::Apple => self.apple_sub = Some(value),
        }
    }

    /// Whether the account carries the verification badge for `provider`.
    #[must_use]
    pub fn has_badge(&self, provider: Provider) -> bool {
        self.verified.contains(&provider)
    }

    /// Add the verification badge for `provider` (idempotent).
    pub fn add_badge(&mut self, provider: Provider) {
        if !self.has_badge(provider) {
            self.verified.push(provider);
        }
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}

/// Profile attributes extracted from a verified credential, used to
/// seed or enrich an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileHints {
    /// Email address, when the credential exposed one.
    pub email: Option<String>,

    /// Display name.
    pub name: Option<String>,

    /// Profile picture URL.
    pub picture: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════

/// One authenticated device or browser instance.
///
/// Durable record binding a refresh-token digest to an account and an
/// absolute expiry. The stored digest must always match the refresh
/// credential most recently issued for this session; any other
/// presented refresh credential is proof of reuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (minted by the durable store).
    pub session_id: SessionId,

    /// Owning account.
    pub account_id: AccountId,

    /// SHA-256 hex digest of the current refresh token. The raw token
    /// is never persisted. Empty string between record allocation and
    /// the first digest write.
    pub refresh_token_hash: String,

    /// Opaque device-type label supplied at login.
    pub device_type: Option<String>,

    /// Origin IP at creation or last rotation.
    pub ip_address: IpAddr,

    /// Session creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Absolute expiry timestamp; advanced on every rotation.
    pub expires_at: DateTime<Utc>,
}

/// Input for allocating a durable session record.
///
/// The repository mints the id and stamps `created_at`; the refresh
/// digest is written separately once tokens embedding the id exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    /// Owning account.
    pub account_id: AccountId,

    /// Opaque device-type label.
    pub device_type: Option<String>,

    /// Origin IP of the authentication request.
    pub ip_address: IpAddr,

    /// Absolute expiry for the new session.
    pub expires_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════
// Issued Credentials
// ═══════════════════════════════════════════════════════════════════════

/// Access/refresh credential pair returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access_token: String,

    /// Long-lived, single-use-per-rotation refresh token.
    pub refresh_token: String,

    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Outcome of a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    /// The resolved account.
    pub account: Account,

    /// `true` when this authentication created the account.
    pub is_new_account: bool,

    /// Freshly issued credential pair.
    pub tokens: TokenPair,
}

/// Verified identity attached to a request by the access-token gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authenticated {
    /// Account the access token was issued to.
    pub account_id: AccountId,

    /// Session the access token belongs to.
    pub session_id: SessionId,
}
