//! Credential store boundary.
//!
//! The orchestrator talks to account storage only through [`CredentialStore`].
//! Mutations that race across requests (failed-attempt counters, one-time
//! token consumption) are single operations here so each backend can make
//! them atomic at the document level instead of read-modify-write in the
//! service layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use self::memory::MemoryCredentialStore;
pub use self::postgres::PgCredentialStore;

/// A stored account record.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    /// Email as the user typed it at registration.
    pub email: String,
    /// Trimmed, lowercased email; unique across accounts.
    pub email_normalized: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub email_verified: bool,
    pub email_verify_token: Option<String>,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub failed_login_attempts: i32,
    pub lock_until: Option<DateTime<Utc>>,
    pub refresh_tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A lock timestamp in the past is equivalent to no lock at all.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.lock_until.is_some_and(|until| until > now)
    }
}

/// Fields required to create an account.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub email: String,
    pub email_normalized: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub email_verify_token: String,
}

/// Counter state after recording a failed login.
#[derive(Clone, Copy, Debug)]
pub struct FailureRecord {
    pub failed_login_attempts: i32,
    pub lock_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-email constraint violation.
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Lookup by normalized email.
    async fn find_by_email(&self, email_normalized: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Insert a new, unverified account. A concurrent insert with the same
    /// normalized email surfaces as [`StoreError::DuplicateEmail`].
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Atomically increment the failed-attempt counter and, when the new
    /// count reaches `threshold`, set the lock to `now + lock_seconds`.
    async fn record_login_failure(
        &self,
        id: Uuid,
        threshold: i32,
        lock_seconds: i64,
    ) -> Result<FailureRecord, StoreError>;

    /// Reset the failed-attempt counter and clear any lock.
    async fn clear_lockout(&self, id: Uuid) -> Result<(), StoreError>;

    /// Flip `email_verified` and clear the stored verify token, but only if
    /// the presented token still matches. Returns `false` when it does not.
    async fn consume_verify_token(&self, id: Uuid, token: &str) -> Result<bool, StoreError>;

    async fn append_refresh_token(&self, id: Uuid, token: &str) -> Result<(), StoreError>;

    async fn remove_refresh_token(&self, id: Uuid, token: &str) -> Result<(), StoreError>;

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Store the new password hash and clear both reset fields in one
    /// conditional update matching email AND token AND an unexpired
    /// timestamp. Returns `false` when no account matched.
    async fn consume_reset_token(
        &self,
        email_normalized: &str,
        token: &str,
        new_password_hash: &str,
    ) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account(lock_until: Option<DateTime<Utc>>) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            email: "User@Example.com".to_string(),
            email_normalized: "user@example.com".to_string(),
            name: None,
            password_hash: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            roles: vec!["user".to_string()],
            email_verified: false,
            email_verify_token: None,
            reset_password_token: None,
            reset_password_expires: None,
            failed_login_attempts: 0,
            lock_until,
            refresh_tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn lock_in_future_is_locked() {
        let now = Utc::now();
        let acct = account(Some(now + Duration::minutes(5)));
        assert!(acct.is_locked(now));
    }

    #[test]
    fn lock_in_past_counts_as_unlocked() {
        let now = Utc::now();
        let acct = account(Some(now - Duration::seconds(1)));
        assert!(!acct.is_locked(now));
    }

    #[test]
    fn absent_lock_is_unlocked() {
        let acct = account(None);
        assert!(!acct.is_locked(Utc::now()));
    }
}
