//! The auth orchestrator: registration, email verification, login,
//! token refresh, logout and password reset.
//!
//! Account state is read and written only through the credential store's
//! atomic operations; no cross-request locks are held here. Outbound email
//! is dispatched fire-and-forget after the triggering write commits.

use chrono::{Duration, Utc};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error, info};
use url::form_urlencoded;
use uuid::Uuid;

use super::challenge::{ChallengeGate, ChallengeTokens};
use super::config::AuthConfig;
use super::error::AuthError;
use super::lockout::LockoutPolicy;
use super::tokens::{AccessClaims, TokenCodec, TokenError};
use super::{one_time, password};
use crate::mail::Mailer;
use crate::store::{CredentialStore, NewAccount};

#[derive(Clone, Debug)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    pub challenge: ChallengeTokens,
}

#[derive(Clone, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub challenge: ChallengeTokens,
}

/// Tokens minted by a successful login, plus the identity summary the
/// client is shown.
#[derive(Clone, Debug)]
pub struct IssuedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

pub struct AuthService {
    config: AuthConfig,
    store: Arc<dyn CredentialStore>,
    challenge: ChallengeGate,
    mailer: Arc<dyn Mailer>,
    codec: TokenCodec,
    lockout: LockoutPolicy,
}

impl AuthService {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn CredentialStore>,
        challenge: ChallengeGate,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let config = config.normalize();
        let codec = TokenCodec::new(&config);
        let lockout = LockoutPolicy::new(config.lockout_threshold(), config.lockout_seconds());
        Self {
            config,
            store,
            challenge,
            mailer,
            codec,
            lockout,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Create an unverified account and dispatch the verification email.
    ///
    /// The verify token travels only through the email channel, never in a
    /// response body.
    pub async fn register(&self, request: RegisterRequest) -> Result<(), AuthError> {
        if !self.challenge.any_passes(&request.challenge).await {
            return Err(AuthError::ChallengeFailed);
        }

        let email_normalized = normalize_email(&request.email);
        if self
            .store
            .find_by_email(&email_normalized)
            .await?
            .is_some()
        {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = password::hash(&request.password, self.config.bcrypt_cost())?;
        let verify_token = one_time::generate().map_err(AuthError::Internal)?;

        // A concurrent insert racing the lookup above still surfaces as
        // EmailTaken through the store's unique constraint.
        let account = self
            .store
            .insert(NewAccount {
                email: request.email.trim().to_string(),
                email_normalized,
                name: request.name,
                password_hash,
                email_verify_token: verify_token.clone(),
            })
            .await?;

        info!(account_id = %account.id, "account registered");

        let verify_url = build_verify_url(
            self.config.frontend_base_url(),
            &verify_token,
            &account.email_normalized,
        );
        self.dispatch_email(
            account.email.clone(),
            "Verify your account",
            format!(r#"<p>Please verify your email by clicking <a href="{verify_url}">here</a></p>"#),
        );

        Ok(())
    }

    /// Consume the verify token. Verifying an already-verified account is a
    /// success without requiring the token again.
    pub async fn verify_email(&self, email: &str, token: &str) -> Result<VerifyOutcome, AuthError> {
        let account = self
            .store
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidRequest)?;

        if account.email_verified {
            return Ok(VerifyOutcome::AlreadyVerified);
        }

        if self.store.consume_verify_token(account.id, token).await? {
            info!(account_id = %account.id, "email verified");
            Ok(VerifyOutcome::Verified)
        } else {
            Err(AuthError::InvalidToken)
        }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<IssuedSession, AuthError> {
        if !self.challenge.any_passes(&request.challenge).await {
            return Err(AuthError::ChallengeFailed);
        }

        // Account existence is never revealed: unknown email and wrong
        // password answer identically.
        let account = self
            .store
            .find_by_email(&normalize_email(&request.email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // Checked before the password so locked accounts skip the hashing
        // cost entirely.
        let now = Utc::now();
        if self.lockout.is_locked(account.lock_until, now) {
            return Err(AuthError::AccountLocked);
        }

        if !password::verify(&request.password, &account.password_hash) {
            let record = self
                .store
                .record_login_failure(
                    account.id,
                    self.lockout.threshold(),
                    self.lockout.lock_seconds(),
                )
                .await?;
            if record.lock_until.is_some_and(|until| until > now) {
                info!(
                    account_id = %account.id,
                    failed_attempts = record.failed_login_attempts,
                    "account locked after repeated failures"
                );
            }
            return Err(AuthError::InvalidCredentials);
        }

        // A correct password always clears the lockout state, even when the
        // verification check below still denies the login.
        self.store.clear_lockout(account.id).await?;

        if !account.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        let access_token = self.codec.issue_access(&account)?;
        let refresh_token = self.codec.issue_refresh(account.id)?;
        self.store
            .append_refresh_token(account.id, &refresh_token)
            .await?;

        Ok(IssuedSession {
            access_token,
            refresh_token,
            email: account.email_normalized,
            name: account.name,
        })
    }

    /// Mint a new access token from a live refresh token. The refresh token
    /// itself is not rotated.
    pub async fn refresh(&self, token: Option<&str>) -> Result<String, AuthError> {
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::NoToken)?;

        let claims = self.codec.verify_refresh(token).map_err(|err| {
            if matches!(err, TokenError::Expired) {
                debug!("presented refresh token was expired");
            }
            AuthError::InvalidToken
        })?;

        let account = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        // A verifiable token that is no longer in the live set was revoked.
        if !account.refresh_tokens.iter().any(|stored| stored == token) {
            return Err(AuthError::InvalidToken);
        }

        Ok(self.codec.issue_access(&account)?)
    }

    /// Verify a bearer access token into caller claims.
    pub fn authenticate(&self, bearer: &str) -> Result<AccessClaims, AuthError> {
        Ok(self.codec.verify_access(bearer)?)
    }

    /// Remove the presented refresh token from the caller's live set.
    /// Idempotent: an absent token is still a success.
    pub async fn logout(&self, caller_id: Uuid, token: Option<&str>) -> Result<(), AuthError> {
        if let Some(token) = token.filter(|token| !token.is_empty()) {
            self.store.remove_refresh_token(caller_id, token).await?;
        }
        Ok(())
    }

    /// Always acknowledges, whether or not the account exists; the token and
    /// email are side effects invisible to the caller.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let Some(account) = self.store.find_by_email(&normalize_email(email)).await? else {
            return Ok(());
        };

        let token = one_time::generate().map_err(AuthError::Internal)?;
        let expires = Utc::now() + Duration::seconds(self.config.reset_token_ttl_seconds());
        self.store.set_reset_token(account.id, &token, expires).await?;

        let reset_url = build_reset_url(
            self.config.frontend_base_url(),
            &token,
            &account.email_normalized,
        );
        self.dispatch_email(
            account.email.clone(),
            "Password reset",
            format!(r#"<p>Reset: <a href="{reset_url}">link</a></p>"#),
        );

        Ok(())
    }

    /// One conditional store update matches email, token and expiry and
    /// writes the new hash while clearing both reset fields.
    pub async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let new_hash = password::hash(new_password, self.config.bcrypt_cost())?;
        let consumed = self
            .store
            .consume_reset_token(&normalize_email(email), token, &new_hash)
            .await?;

        if consumed {
            Ok(())
        } else {
            Err(AuthError::InvalidOrExpiredToken)
        }
    }

    fn dispatch_email(&self, to: String, subject: &'static str, html_body: String) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            if let Err(err) = mailer.send(&to, subject, &html_body).await {
                error!("failed to send \"{subject}\" email: {err:#}");
            }
        });
    }
}

fn build_verify_url(frontend_base_url: &str, token: &str, email: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    let email: String = form_urlencoded::byte_serialize(email.as_bytes()).collect();
    format!("{base}/verify-email?token={token}&email={email}")
}

fn build_reset_url(frontend_base_url: &str, token: &str, email: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    let email: String = form_urlencoded::byte_serialize(email.as_bytes()).collect();
    format!("{base}/reset-password?token={token}&email={email}")
}
