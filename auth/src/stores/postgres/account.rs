//! `PostgreSQL` account repository.
//!
//! Persistent storage for accounts. Unique partial indexes on each
//! external identifier column back the one-account-per-identifier
//! invariant; violations surface as `AuthError::AccountConflict`.
//!
//! Queries are bound at runtime so the crate builds without a live
//! database; the schema lives in `migrations/`.

use crate::error::{AuthError, Result};
use crate::providers::AccountRepository;
use crate::state::{Account, AccountId, Provider};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// Decode one column, mapping decode failures to `DatabaseError`.
pub(crate) fn get_field<'r, T>(row: &'r PgRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| AuthError::DatabaseError(format!("Failed to decode row column {column}: {e}")))
}

/// `PostgreSQL` account repository.
#[derive(Clone)]
pub struct PostgresAccountRepository {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

const SELECT_ACCOUNT: &str = "SELECT account_id, phone, email, google_sub, apple_sub, \
     name, picture, verified, created_at, last_active_at FROM accounts";

impl PostgresAccountRepository {
    /// Create a new `PostgreSQL` account repository.
    ///
    /// # Arguments
    ///
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// The identifier column for a credential path.
    const fn identifier_column(provider: Provider) -> &'static str {
        match provider {
            Provider::Phone => "phone",
            Provider::Google => "google_sub",
            Provider::Apple => "apple_sub",
        }
    }

    fn account_from_row(row: &PgRow) -> Result<Account> {
        let verified_raw: Vec<String> = row
            .try_get("verified")
            .map_err(|e| AuthError::DatabaseError(format!("Failed to decode account row: {e}")))?;
        let verified = verified_raw
            .iter()
            .map(|s| Provider::parse(s))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AuthError::DatabaseError)?;

        Ok(Account {
            account_id: AccountId(get_field(row, "account_id")?),
            phone: get_field(row, "phone")?,
            email: get_field(row, "email")?,
            google_sub: get_field(row, "google_sub")?,
            apple_sub: get_field(row, "apple_sub")?,
            name: get_field(row, "name")?,
            picture: get_field(row, "picture")?,
            verified,
            created_at: get_field(row, "created_at")?,
            last_active_at: get_field(row, "last_active_at")?,
        })
    }

    fn map_write_error(e: sqlx::Error, operation: &str) -> AuthError {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AuthError::AccountConflict;
            }
        }
        AuthError::DatabaseError(format!("Failed to {operation}: {e}"))
    }
}

impl AccountRepository for PostgresAccountRepository {
    async fn find_by_id(&self, account_id: AccountId) -> Result<Option<Account>> {
        let query = format!("{SELECT_ACCOUNT} WHERE account_id = $1");

        let row = sqlx::query(&query)
            .bind(account_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to get account: {e}")))?;

        row.as_ref().map(Self::account_from_row).transpose()
    }

    async fn find_by_identifier(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> Result<Option<Account>> {
        let column = Self::identifier_column(provider);
        let query = format!("{SELECT_ACCOUNT} WHERE {column} = $1");

        let row = sqlx::query(&query)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to get account: {e}")))?;

        row.as_ref().map(Self::account_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = format!("{SELECT_ACCOUNT} WHERE email = $1");

        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to get account: {e}")))?;

        row.as_ref().map(Self::account_from_row).transpose()
    }

    async fn create_account(&self, account: &Account) -> Result<Account> {
        let verified: Vec<String> = account
            .verified
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        sqlx::query(
            "INSERT INTO accounts \
                 (account_id, phone, email, google_sub, apple_sub, name, picture, \
                  verified, created_at, last_active_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(account.account_id.0)
        .bind(&account.phone)
        .bind(&account.email)
        .bind(&account.google_sub)
        .bind(&account.apple_sub)
        .bind(&account.name)
        .bind(&account.picture)
        .bind(&verified)
        .bind(account.created_at)
        .bind(account.last_active_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, "create account"))?;

        Ok(account.clone())
    }

    async fn update_account(&self, account: &Account) -> Result<Account> {
        let verified: Vec<String> = account
            .verified
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        let result = sqlx::query(
            "UPDATE accounts \
             SET phone = $2, \
                 email = $3, \
                 google_sub = $4, \
                 apple_sub = $5, \
                 name = $6, \
                 picture = $7, \
                 verified = $8, \
                 last_active_at = $9 \
             WHERE account_id = $1",
        )
        .bind(account.account_id.0)
        .bind(&account.phone)
        .bind(&account.email)
        .bind(&account.google_sub)
        .bind(&account.apple_sub)
        .bind(&account.name)
        .bind(&account.picture)
        .bind(&verified)
        .bind(account.last_active_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, "update account"))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::DatabaseError("Account not found".to_string()));
        }

        Ok(account.clone())
    }

    async fn touch_last_active(&self, account_id: AccountId) -> Result<()> {
        sqlx::query("UPDATE accounts SET last_active_at = NOW() WHERE account_id = $1")
            .bind(account_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to touch account: {e}")))?;

        Ok(())
    }
}
