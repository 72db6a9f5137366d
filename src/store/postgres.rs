//! Postgres-backed credential store.
//!
//! Counter updates and one-time token consumption are single conditional
//! `UPDATE` statements so they stay atomic per row under concurrent
//! requests. See `sql/schema.sql` for the table definition.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{Account, CredentialStore, FailureRecord, NewAccount, StoreError};

const ACCOUNT_COLUMNS: &str = "id, email, email_normalized, name, password_hash, roles, \
     email_verified, email_verify_token, reset_password_token, reset_password_expires, \
     failed_login_attempts, lock_until, refresh_tokens, created_at, updated_at";

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &sqlx::postgres::PgRow) -> Account {
    Account {
        id: row.get("id"),
        email: row.get("email"),
        email_normalized: row.get("email_normalized"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        roles: row.get("roles"),
        email_verified: row.get("email_verified"),
        email_verify_token: row.get("email_verify_token"),
        reset_password_token: row.get("reset_password_token"),
        reset_password_expires: row.get("reset_password_expires"),
        failed_login_attempts: row.get("failed_login_attempts"),
        lock_until: row.get("lock_until"),
        refresh_tokens: row.get("refresh_tokens"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn query_span(operation: &'static str, statement: &str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email_normalized: &str) -> Result<Option<Account>, StoreError> {
        let query =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email_normalized = $1");
        let row = sqlx::query(&query)
            .bind(email_normalized)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup account by email")?;
        Ok(row.as_ref().map(account_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup account by id")?;
        Ok(row.as_ref().map(account_from_row))
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            "INSERT INTO accounts (email, email_normalized, name, password_hash, email_verify_token) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(&account.email)
            .bind(&account.email_normalized)
            .bind(&account.name)
            .bind(&account.password_hash)
            .bind(&account.email_verify_token)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await;

        match row {
            Ok(row) => Ok(account_from_row(&row)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateEmail),
            Err(err) => Err(anyhow::Error::from(err)
                .context("failed to insert account")
                .into()),
        }
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        threshold: i32,
        lock_seconds: i64,
    ) -> Result<FailureRecord, StoreError> {
        // Increment and conditionally lock in one statement; interleaved
        // failures each observe their own post-increment count.
        let query = "UPDATE accounts \
             SET failed_login_attempts = failed_login_attempts + 1, \
                 lock_until = CASE \
                     WHEN failed_login_attempts + 1 >= $2 \
                     THEN NOW() + ($3 * INTERVAL '1 second') \
                     ELSE lock_until \
                 END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING failed_login_attempts, lock_until";
        let row = sqlx::query(query)
            .bind(id)
            .bind(threshold)
            .bind(lock_seconds)
            .fetch_one(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to record login failure")?;
        Ok(FailureRecord {
            failed_login_attempts: row.get("failed_login_attempts"),
            lock_until: row.get("lock_until"),
        })
    }

    async fn clear_lockout(&self, id: Uuid) -> Result<(), StoreError> {
        let query = "UPDATE accounts \
             SET failed_login_attempts = 0, lock_until = NULL, updated_at = NOW() \
             WHERE id = $1";
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to clear lockout state")?;
        Ok(())
    }

    async fn consume_verify_token(&self, id: Uuid, token: &str) -> Result<bool, StoreError> {
        let query = "UPDATE accounts \
             SET email_verified = TRUE, email_verify_token = NULL, updated_at = NOW() \
             WHERE id = $1 AND email_verify_token = $2 \
             RETURNING id";
        let row = sqlx::query(query)
            .bind(id)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to consume verify token")?;
        Ok(row.is_some())
    }

    async fn append_refresh_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        let query = "UPDATE accounts \
             SET refresh_tokens = array_append(refresh_tokens, $2), updated_at = NOW() \
             WHERE id = $1";
        sqlx::query(query)
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to append refresh token")?;
        Ok(())
    }

    async fn remove_refresh_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        let query = "UPDATE accounts \
             SET refresh_tokens = array_remove(refresh_tokens, $2), updated_at = NOW() \
             WHERE id = $1";
        sqlx::query(query)
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to remove refresh token")?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query = "UPDATE accounts \
             SET reset_password_token = $2, reset_password_expires = $3, updated_at = NOW() \
             WHERE id = $1";
        sqlx::query(query)
            .bind(id)
            .bind(token)
            .bind(expires)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to set reset token")?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        email_normalized: &str,
        token: &str,
        new_password_hash: &str,
    ) -> Result<bool, StoreError> {
        // Expired tokens are rejected here, not purged; the row keeps its
        // stale fields until the next successful reset overwrites them.
        let query = "UPDATE accounts \
             SET password_hash = $3, \
                 reset_password_token = NULL, \
                 reset_password_expires = NULL, \
                 updated_at = NOW() \
             WHERE email_normalized = $1 \
               AND reset_password_token = $2 \
               AND reset_password_expires > NOW() \
             RETURNING id";
        let row = sqlx::query(query)
            .bind(email_normalized)
            .bind(token)
            .bind(new_password_hash)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to consume reset token")?;
        Ok(row.is_some())
    }
}
