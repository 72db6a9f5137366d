//! In-memory credential store for local development and tests.
//!
//! Mirrors the conditional-update semantics of the Postgres backend under a
//! single mutex, which makes every operation trivially atomic.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{Account, CredentialStore, FailureRecord, NewAccount, StoreError};

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email_normalized: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().expect("store mutex poisoned");
        Ok(accounts
            .values()
            .find(|account| account.email_normalized == email_normalized)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().expect("store mutex poisoned");
        Ok(accounts.get(&id).cloned())
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.lock().expect("store mutex poisoned");
        if accounts
            .values()
            .any(|existing| existing.email_normalized == account.email_normalized)
        {
            return Err(StoreError::DuplicateEmail);
        }
        let now = Utc::now();
        let record = Account {
            id: Uuid::new_v4(),
            email: account.email,
            email_normalized: account.email_normalized,
            name: account.name,
            password_hash: account.password_hash,
            roles: vec!["user".to_string()],
            email_verified: false,
            email_verify_token: Some(account.email_verify_token),
            reset_password_token: None,
            reset_password_expires: None,
            failed_login_attempts: 0,
            lock_until: None,
            refresh_tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        accounts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        threshold: i32,
        lock_seconds: i64,
    ) -> Result<FailureRecord, StoreError> {
        let mut accounts = self.accounts.lock().expect("store mutex poisoned");
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("account {id} not found"))?;
        let now = Utc::now();
        account.failed_login_attempts += 1;
        if account.failed_login_attempts >= threshold {
            account.lock_until = Some(now + Duration::seconds(lock_seconds));
        }
        account.updated_at = now;
        Ok(FailureRecord {
            failed_login_attempts: account.failed_login_attempts,
            lock_until: account.lock_until,
        })
    }

    async fn clear_lockout(&self, id: Uuid) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().expect("store mutex poisoned");
        if let Some(account) = accounts.get_mut(&id) {
            account.failed_login_attempts = 0;
            account.lock_until = None;
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn consume_verify_token(&self, id: Uuid, token: &str) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.lock().expect("store mutex poisoned");
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(false);
        };
        if account.email_verify_token.as_deref() != Some(token) {
            return Ok(false);
        }
        account.email_verified = true;
        account.email_verify_token = None;
        account.updated_at = Utc::now();
        Ok(true)
    }

    async fn append_refresh_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().expect("store mutex poisoned");
        if let Some(account) = accounts.get_mut(&id) {
            account.refresh_tokens.push(token.to_string());
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn remove_refresh_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().expect("store mutex poisoned");
        if let Some(account) = accounts.get_mut(&id) {
            account.refresh_tokens.retain(|stored| stored != token);
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().expect("store mutex poisoned");
        if let Some(account) = accounts.get_mut(&id) {
            account.reset_password_token = Some(token.to_string());
            account.reset_password_expires = Some(expires);
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        email_normalized: &str,
        token: &str,
        new_password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.lock().expect("store mutex poisoned");
        let now = Utc::now();
        let Some(account) = accounts.values_mut().find(|account| {
            account.email_normalized == email_normalized
                && account.reset_password_token.as_deref() == Some(token)
                && account.reset_password_expires.is_some_and(|at| at > now)
        }) else {
            return Ok(false);
        };
        account.password_hash = new_password_hash.to_string();
        account.reset_password_token = None;
        account.reset_password_expires = None;
        account.updated_at = now;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            email_normalized: email.to_lowercase(),
            name: None,
            password_hash: "hash".to_string(),
            email_verify_token: "verify-token".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_normalized_email() {
        let store = MemoryCredentialStore::new();
        store.insert(new_account("a@x.com")).await.expect("insert");
        let err = store.insert(new_account("A@X.com")).await.err();
        assert!(matches!(err, Some(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn failure_record_locks_at_threshold() {
        let store = MemoryCredentialStore::new();
        let account = store.insert(new_account("a@x.com")).await.expect("insert");

        for attempt in 1..=4 {
            let record = store
                .record_login_failure(account.id, 5, 1800)
                .await
                .expect("failure");
            assert_eq!(record.failed_login_attempts, attempt);
            assert!(record.lock_until.is_none());
        }
        let record = store
            .record_login_failure(account.id, 5, 1800)
            .await
            .expect("failure");
        assert_eq!(record.failed_login_attempts, 5);
        assert!(record.lock_until.is_some());
    }

    #[tokio::test]
    async fn verify_token_single_consumption() {
        let store = MemoryCredentialStore::new();
        let account = store.insert(new_account("a@x.com")).await.expect("insert");

        assert!(store
            .consume_verify_token(account.id, "verify-token")
            .await
            .expect("consume"));
        // Token cleared on first use.
        assert!(!store
            .consume_verify_token(account.id, "verify-token")
            .await
            .expect("consume"));
    }

    #[tokio::test]
    async fn reset_token_expiry_checked_on_consumption() {
        let store = MemoryCredentialStore::new();
        let account = store.insert(new_account("a@x.com")).await.expect("insert");

        store
            .set_reset_token(account.id, "reset", Utc::now() - Duration::seconds(1))
            .await
            .expect("set");
        assert!(!store
            .consume_reset_token("a@x.com", "reset", "new-hash")
            .await
            .expect("consume"));

        store
            .set_reset_token(account.id, "reset", Utc::now() + Duration::hours(1))
            .await
            .expect("set");
        assert!(store
            .consume_reset_token("a@x.com", "reset", "new-hash")
            .await
            .expect("consume"));

        let stored = store
            .find_by_id(account.id)
            .await
            .expect("find")
            .expect("account");
        assert_eq!(stored.password_hash, "new-hash");
        assert!(stored.reset_password_token.is_none());
        assert!(stored.reset_password_expires.is_none());
    }
}
