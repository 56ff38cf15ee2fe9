//! Account repository trait.

use crate::error::Result;
use crate::state::{Account, AccountId, Provider};

/// Durable account storage.
///
/// This trait abstracts over the system of record for accounts
/// (`PostgreSQL`). Each external identifier maps to at most one
/// account; implementations back this with unique constraints and
/// surface violations as `AuthError::AccountConflict`.
pub trait AccountRepository: Send + Sync {
    /// Find an account by id.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn find_by_id(
        &self,
        account_id: AccountId,
    ) -> impl std::future::Future<Output = Result<Option<Account>>> + Send;

    /// Find the account owning the external identifier for a
    /// credential path (phone number, Google subject, Apple subject).
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn find_by_identifier(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Account>>> + Send;

    /// Find the account owning an email address.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<Account>>> + Send;

    /// Persist a new account.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - An external identifier is already linked elsewhere → `AuthError::AccountConflict`
    /// - The store request fails
    fn create_account(
        &self,
        account: &Account,
    ) -> impl std::future::Future<Output = Result<Account>> + Send;

    /// Persist changes to an existing account (badges, linked
    /// identifiers, profile fields, `last_active_at`).
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - A newly linked identifier is already linked elsewhere → `AuthError::AccountConflict`
    /// - The account does not exist or the store request fails
    fn update_account(
        &self,
        account: &Account,
    ) -> impl std::future::Future<Output = Result<Account>> + Send;

    /// Stamp the account's `last_active_at` with the current time.
    ///
    /// # Errors
    ///
    /// Returns error if the store request fails.
    fn touch_last_active(
        &self,
        account_id: AccountId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
