//! # Tradepost Authentication & Session Lifecycle
//!
//! This crate authenticates marketplace users through three credential
//! paths (phone one-time code, Google identity token, Apple identity
//! token) and manages the sessions that result: short-lived access
//! tokens, rotating refresh tokens with reuse detection, and a
//! per-account cap on concurrent sessions.
//!
//! ## Architecture
//!
//! Components depend on the trait seams in [`providers`]; the process
//! entry point constructs concrete stores ([`stores`] for Redis and
//! `PostgreSQL`, [`mocks`] for tests) and injects them:
//!
//! ```text
//! request → RateGuard → CredentialVerifier → IdentityResolver
//!                                                │
//!                                     SessionManager.create_session
//!                                                │
//!                                       TokenCodec (access+refresh)
//! ```
//!
//! `PostgreSQL` is the source of truth for accounts and sessions;
//! Redis carries the verification challenges, the rate counters, and
//! an advisory session-validity cache that is never trusted to prove
//! absence.
//!
//! ## Example: wiring the service
//!
//! ```rust,ignore
//! use tradepost_auth::*;
//!
//! let codec = TokenCodec::new(&token_config);
//! let service = AuthService::new(
//!     PhoneVerifier::new(challenges, guard.clone(), PhoneConfig::new()),
//!     GoogleTokenVerifier::new().with_audience(google_client_id),
//!     AppleTokenVerifier::new().with_audience(apple_bundle_id),
//!     IdentityResolver::new(accounts),
//!     SessionManager::new(sessions, cache, codec, SessionConfig::new()),
//! );
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod config;
pub mod error;
pub mod identity;
pub mod phone;
pub mod providers;
pub mod service;
pub mod sessions;
pub mod state;
pub mod stores;
pub mod tokens;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use config::{PhoneConfig, SessionConfig, TokenConfig};
pub use error::{AuthError, Result};
pub use identity::IdentityResolver;
pub use phone::PhoneVerifier;
pub use providers::{AppleTokenVerifier, GoogleTokenVerifier};
pub use service::AuthService;
pub use sessions::SessionManager;
pub use state::{
    Account, AccountId, Authenticated, AuthResult, Provider, Session, SessionId, TokenPair,
};
pub use tokens::{TokenCodec, TokenKind};
