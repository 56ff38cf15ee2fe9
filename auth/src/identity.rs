//! External identity to account resolution.
//!
//! Maps a verified external identity (phone number, Google subject,
//! Apple subject) to an internal account, creating or linking one when
//! necessary. The anti-duplication invariant (at most one account per
//! distinct external identifier) is enforced by unique constraints in
//! the durable store, with the lookup-first path here producing a
//! friendly conflict instead of a raw constraint violation.

use crate::error::{AuthError, Result};
use crate::providers::AccountRepository;
use crate::state::{Account, ProfileHints, Provider};

/// Resolves verified external identities to accounts.
#[derive(Clone)]
pub struct IdentityResolver<A>
where
    A: AccountRepository,
{
    accounts: A,
}

impl<A> IdentityResolver<A>
where
    A: AccountRepository,
{
    /// Create a resolver over the given account repository.
    pub const fn new(accounts: A) -> Self {
        Self { accounts }
    }

    /// Resolve a verified external identity to an account.
    ///
    /// Lookup order:
    /// 1. exact match on the provider's identifier;
    /// 2. with an email hint, link into the account owning that email
    ///    (adding the provider's badge instead of duplicating);
    /// 3. otherwise create a new account seeded from the hints.
    ///
    /// # Returns
    ///
    /// The account and `true` when this call created it.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Linking would bind the identifier to a second account → `AuthError::AccountConflict`
    /// - The store request fails
    pub async fn resolve(
        &self,
        provider: Provider,
        external_id: &str,
        hints: &ProfileHints,
    ) -> Result<(Account, bool)> {
        if let Some(account) = self.accounts.find_by_identifier(provider, external_id).await? {
            let account = self.refresh_existing(account, provider, hints).await?;
            return Ok((account, false));
        }

        if let Some(email) = hints.email.as_deref() {
            if let Some(account) = self.accounts.find_by_email(email).await? {
                let account = self.link(account, provider, external_id, hints).await?;
                return Ok((account, false));
            }
        }

        let account = self.create(provider, external_id, hints).await?;
        Ok((account, true))
    }

    /// Returning login: backfill profile fields and stamp activity.
    async fn refresh_existing(
        &self,
        mut account: Account,
        provider: Provider,
        hints: &ProfileHints,
    ) -> Result<Account> {
        let badge_missing = !account.has_badge(provider);
        let enriched = backfill_profile(&mut account, hints);

        if badge_missing || enriched {
            account.add_badge(provider);
            account = self.accounts.update_account(&account).await?;
        }
        self.accounts.touch_last_active(account.account_id).await?;

        Ok(account)
    }

    /// Second credential path authenticating an email we already know:
    /// link the new provider into the existing account.
    async fn link(
        &self,
        mut account: Account,
        provider: Provider,
        external_id: &str,
        hints: &ProfileHints,
    ) -> Result<Account> {
        match account.identifier(provider) {
            // Identifier already recorded and pointing elsewhere:
            // find_by_identifier above missed it, so the subjects differ.
            Some(existing) if existing != external_id => {
                tracing::warn!(
                    account_id = %account.account_id.0,
                    provider = provider.as_str(),
                    "Email owner already linked to a different subject"
                );
                return Err(AuthError::AccountConflict);
            }
            _ => {}
        }

        account.set_identifier(provider, external_id.to_string());
        account.add_badge(provider);
        backfill_profile(&mut account, hints);

        let account = self.accounts.update_account(&account).await?;
        self.accounts.touch_last_active(account.account_id).await?;

        tracing::info!(
            account_id = %account.account_id.0,
            provider = provider.as_str(),
            "Linked credential path into existing account"
        );

        Ok(account)
    }

    /// First contact: create an account seeded from the hints.
    async fn create(
        &self,
        provider: Provider,
        external_id: &str,
        hints: &ProfileHints,
    ) -> Result<Account> {
        let mut account = Account::new();
        account.set_identifier(provider, external_id.to_string());
        account.add_badge(provider);
        account.email = hints.email.clone();
        account.name = hints.name.clone();
        account.picture = hints.picture.clone();

        let account = self.accounts.create_account(&account).await?;

        tracing::info!(
            account_id = %account.account_id.0,
            provider = provider.as_str(),
            "Created account"
        );

        Ok(account)
    }
}

/// Copy hint fields the account is still missing. Returns `true` when
/// anything changed.
fn backfill_profile(account: &mut Account, hints: &ProfileHints) -> bool {
    let mut changed = false;

    if account.email.is_none() && hints.email.is_some() {
        account.email = hints.email.clone();
        changed = true;
    }
    if account.name.is_none() && hints.name.is_some() {
        account.name = hints.name.clone();
        changed = true;
    }
    if account.picture.is_none() && hints.picture.is_some() {
        account.picture = hints.picture.clone();
        changed = true;
    }

    changed
}
