//! Mock account repository for testing.

use crate::error::{AuthError, Result};
use crate::providers::AccountRepository;
use crate::state::{Account, AccountId, Provider};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Mock account repository.
///
/// Uses in-memory storage and enforces the one-account-per-identifier
/// invariant the way the Postgres unique indexes do.
#[derive(Debug, Clone, Default)]
pub struct MockAccountRepository {
    accounts: Arc<Mutex<HashMap<AccountId, Account>>>,
}

impl MockAccountRepository {
    /// Create a new mock account repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get count of stored accounts (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn account_count(&self) -> Result<usize> {
        Ok(self
            .accounts
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
            .len())
    }

    /// Whether `candidate` collides with another account on any unique
    /// identifier column.
    fn conflicts(existing: &Account, candidate: &Account) -> bool {
        if existing.account_id == candidate.account_id {
            return false;
        }

        let same = |a: &Option<String>, b: &Option<String>| {
            matches!((a, b), (Some(x), Some(y)) if x == y)
        };

        same(&existing.phone, &candidate.phone)
            || same(&existing.email, &candidate.email)
            || same(&existing.google_sub, &candidate.google_sub)
            || same(&existing.apple_sub, &candidate.apple_sub)
    }
}

impl AccountRepository for MockAccountRepository {
    fn find_by_id(
        &self,
        account_id: AccountId,
    ) -> impl Future<Output = Result<Option<Account>>> + Send {
        let accounts = Arc::clone(&self.accounts);

        async move {
            let guard = accounts
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;
            Ok(guard.get(&account_id).cloned())
        }
    }

    fn find_by_identifier(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> impl Future<Output = Result<Option<Account>>> + Send {
        let accounts = Arc::clone(&self.accounts);
        let external_id = external_id.to_string();

        async move {
            let guard = accounts
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;
            Ok(guard
                .values()
                .find(|a| a.identifier(provider) == Some(external_id.as_str()))
                .cloned())
        }
    }

    fn find_by_email(&self, email: &str) -> impl Future<Output = Result<Option<Account>>> + Send {
        let accounts = Arc::clone(&self.accounts);
        let email = email.to_string();

        async move {
            let guard = accounts
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;
            Ok(guard
                .values()
                .find(|a| a.email.as_deref() == Some(email.as_str()))
                .cloned())
        }
    }

    fn create_account(&self, account: &Account) -> impl Future<Output = Result<Account>> + Send {
        let accounts = Arc::clone(&self.accounts);
        let account = account.clone();

        async move {
            let mut guard = accounts
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;

            if guard.values().any(|a| Self::conflicts(a, &account)) {
                return Err(AuthError::AccountConflict);
            }

            guard.insert(account.account_id, account.clone());
            Ok(account)
        }
    }

    fn update_account(&self, account: &Account) -> impl Future<Output = Result<Account>> + Send {
        let accounts = Arc::clone(&self.accounts);
        let account = account.clone();

        async move {
            let mut guard = accounts
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;

            if !guard.contains_key(&account.account_id) {
                return Err(AuthError::DatabaseError("Account not found".to_string()));
            }

            if guard.values().any(|a| Self::conflicts(a, &account)) {
                return Err(AuthError::AccountConflict);
            }

            guard.insert(account.account_id, account.clone());
            Ok(account)
        }
    }

    fn touch_last_active(&self, account_id: AccountId) -> impl Future<Output = Result<()>> + Send {
        let accounts = Arc::clone(&self.accounts);

        async move {
            let mut guard = accounts
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;

            if let Some(account) = guard.get_mut(&account_id) {
                account.last_active_at = chrono::Utc::now();
            }
            Ok(())
        }
    }
}
