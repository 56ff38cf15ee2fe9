//! `PostgreSQL` session repository.
//!
//! Persistent storage for session records. The rotation commit is a
//! single conditional `UPDATE` keyed on the previous refresh digest;
//! Postgres row-level atomicity guarantees that of two concurrent
//! rotations presenting the same token, exactly one affects a row.

use super::account::get_field;
use crate::error::{AuthError, Result};
use crate::providers::SessionRepository;
use crate::state::{AccountId, NewSession, Session, SessionId};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use std::net::IpAddr;

/// `PostgreSQL` session repository.
#[derive(Clone)]
pub struct PostgresSessionRepository {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

const SELECT_SESSION: &str = "SELECT session_id, account_id, refresh_token_hash, device_type, \
     ip_address, created_at, expires_at FROM sessions";

impl PostgresSessionRepository {
    /// Create a new `PostgreSQL` session repository.
    ///
    /// # Arguments
    ///
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn session_from_row(row: &PgRow) -> Result<Session> {
        let ip_raw: String = get_field(row, "ip_address")?;
        let ip_address = ip_raw
            .parse::<IpAddr>()
            .map_err(|e| AuthError::DatabaseError(format!("Corrupt session ip_address: {e}")))?;

        Ok(Session {
            session_id: SessionId(get_field(row, "session_id")?),
            account_id: AccountId(get_field(row, "account_id")?),
            refresh_token_hash: get_field(row, "refresh_token_hash")?,
            device_type: get_field(row, "device_type")?,
            ip_address,
            created_at: get_field(row, "created_at")?,
            expires_at: get_field(row, "expires_at")?,
        })
    }
}

impl SessionRepository for PostgresSessionRepository {
    async fn create_session(&self, new_session: &NewSession) -> Result<Session> {
        let row = sqlx::query(
            "INSERT INTO sessions \
                 (account_id, refresh_token_hash, device_type, ip_address, expires_at) \
             VALUES ($1, '', $2, $3, $4) \
             RETURNING session_id, created_at",
        )
        .bind(new_session.account_id.0)
        .bind(&new_session.device_type)
        .bind(new_session.ip_address.to_string())
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to create session: {e}")))?;

        Ok(Session {
            session_id: SessionId(get_field(&row, "session_id")?),
            account_id: new_session.account_id,
            refresh_token_hash: String::new(),
            device_type: new_session.device_type.clone(),
            ip_address: new_session.ip_address,
            created_at: get_field(&row, "created_at")?,
            expires_at: new_session.expires_at,
        })
    }

    async fn find_session(&self, session_id: SessionId) -> Result<Option<Session>> {
        let query = format!("{SELECT_SESSION} WHERE session_id = $1");

        let row = sqlx::query(&query)
            .bind(session_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to get session: {e}")))?;

        row.as_ref().map(Self::session_from_row).transpose()
    }

    async fn set_refresh_hash(&self, session_id: SessionId, refresh_token_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE sessions SET refresh_token_hash = $2 WHERE session_id = $1")
            .bind(session_id.0)
            .bind(refresh_token_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to set refresh hash: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::SessionNotFound);
        }

        Ok(())
    }

    async fn rotate_refresh_hash(
        &self,
        session_id: SessionId,
        expected_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
        new_ip: IpAddr,
    ) -> Result<bool> {
        // Compare-and-swap: the WHERE clause makes the hash check and
        // the overwrite one atomic statement.
        let result = sqlx::query(
            "UPDATE sessions \
             SET refresh_token_hash = $3, \
                 expires_at = $4, \
                 ip_address = $5 \
             WHERE session_id = $1 AND refresh_token_hash = $2",
        )
        .bind(session_id.0)
        .bind(expected_hash)
        .bind(new_hash)
        .bind(new_expires_at)
        .bind(new_ip.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to rotate refresh hash: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_session(&self, session_id: SessionId) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to delete session: {e}")))?;

        Ok(())
    }

    async fn delete_account_sessions(&self, account_id: AccountId) -> Result<Vec<SessionId>> {
        let rows = sqlx::query("DELETE FROM sessions WHERE account_id = $1 RETURNING session_id")
            .bind(account_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AuthError::DatabaseError(format!("Failed to delete account sessions: {e}"))
            })?;

        rows.iter()
            .map(|row| Ok(SessionId(get_field(row, "session_id")?)))
            .collect()
    }

    async fn list_account_sessions(&self, account_id: AccountId) -> Result<Vec<Session>> {
        let query = format!("{SELECT_SESSION} WHERE account_id = $1 ORDER BY created_at ASC");

        let rows = sqlx::query(&query)
            .bind(account_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to list sessions: {e}")))?;

        rows.iter().map(Self::session_from_row).collect()
    }
}
