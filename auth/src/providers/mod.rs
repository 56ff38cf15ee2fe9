//! Provider traits for the authentication subsystem.
//!
//! This module defines traits for every external dependency the auth
//! components use. These traits enable dependency injection and make
//! the flow logic testable: store handles are constructed by the
//! process entry point and passed down, never reached through ambient
//! global state.
//!
//! - **Testing**: in-memory mocks (deterministic, memory speed)
//! - **Production**: Redis and `PostgreSQL` implementations in [`crate::stores`]

pub mod account;
pub mod challenge;
pub mod federated;
pub mod rate_guard;
pub mod session;
pub mod session_cache;

// Re-export provider traits
pub use account::AccountRepository;
pub use challenge::{ChallengeStore, CodeCheck};
pub use federated::{AppleTokenVerifier, FederatedIdentity, FederatedTokenVerifier, GoogleTokenVerifier};
pub use rate_guard::RateGuard;
pub use session::SessionRepository;
pub use session_cache::SessionCache;
