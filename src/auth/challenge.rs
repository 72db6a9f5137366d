//! Bot-mitigation challenge verification.
//!
//! The providers are external oracles: given an opaque client-supplied
//! token they answer pass or fail. A missing token is always a fail, never
//! an error, and transport failures are fail-closed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info_span, Instrument};

use crate::APP_USER_AGENT;

const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";
const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[async_trait]
pub trait ChallengeOracle: Send + Sync {
    /// Pass/fail for one provider token. Never errors; fail-closed.
    async fn verify(&self, token: &str) -> bool;
}

/// Siteverify-style provider (Turnstile, reCAPTCHA).
pub struct HttpChallengeVerifier {
    client: Client,
    verify_url: String,
    secret: SecretString,
}

impl HttpChallengeVerifier {
    #[must_use]
    pub fn new(client: Client, verify_url: String, secret: SecretString) -> Self {
        Self {
            client,
            verify_url,
            secret,
        }
    }

    #[must_use]
    pub fn turnstile(client: Client, secret: SecretString) -> Self {
        Self::new(client, TURNSTILE_VERIFY_URL.to_string(), secret)
    }

    #[must_use]
    pub fn recaptcha(client: Client, secret: SecretString) -> Self {
        Self::new(client, RECAPTCHA_VERIFY_URL.to_string(), secret)
    }
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
}

#[async_trait]
impl ChallengeOracle for HttpChallengeVerifier {
    async fn verify(&self, token: &str) -> bool {
        if token.trim().is_empty() {
            return false;
        }

        let span = info_span!(
            "challenge.verify",
            http.method = "POST",
            url = %self.verify_url
        );
        let outcome = async {
            let response = self
                .client
                .post(&self.verify_url)
                .form(&[
                    ("secret", self.secret.expose_secret()),
                    ("response", token),
                ])
                .send()
                .await?;
            response.json::<SiteverifyResponse>().await
        }
        .instrument(span)
        .await;

        match outcome {
            Ok(body) => body.success,
            Err(err) => {
                error!("challenge verification failed: {err}");
                false
            }
        }
    }
}

/// Fixed-outcome oracle for local development and tests.
#[derive(Clone, Copy, Debug)]
pub struct StaticChallenge {
    outcome: bool,
}

impl StaticChallenge {
    #[must_use]
    pub fn passing() -> Self {
        Self { outcome: true }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self { outcome: false }
    }
}

#[async_trait]
impl ChallengeOracle for StaticChallenge {
    async fn verify(&self, _token: &str) -> bool {
        self.outcome
    }
}

/// Client-supplied provider tokens, one slot per supported provider.
#[derive(Clone, Debug, Default)]
pub struct ChallengeTokens {
    pub turnstile: Option<String>,
    pub recaptcha: Option<String>,
}

/// Requires at least one provider to pass.
pub struct ChallengeGate {
    turnstile: Arc<dyn ChallengeOracle>,
    recaptcha: Arc<dyn ChallengeOracle>,
}

impl ChallengeGate {
    #[must_use]
    pub fn new(turnstile: Arc<dyn ChallengeOracle>, recaptcha: Arc<dyn ChallengeOracle>) -> Self {
        Self {
            turnstile,
            recaptcha,
        }
    }

    /// Build the production gate with a bounded-timeout HTTP client shared
    /// by both providers.
    pub fn from_secrets(
        turnstile_secret: SecretString,
        recaptcha_secret: SecretString,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(5))
            .build()
            .context("failed to build challenge HTTP client")?;
        Ok(Self::new(
            Arc::new(HttpChallengeVerifier::turnstile(
                client.clone(),
                turnstile_secret,
            )),
            Arc::new(HttpChallengeVerifier::recaptcha(client, recaptcha_secret)),
        ))
    }

    pub async fn any_passes(&self, tokens: &ChallengeTokens) -> bool {
        if let Some(token) = tokens.turnstile.as_deref() {
            if self.turnstile.verify(token).await {
                return true;
            }
        }
        if let Some(token) = tokens.recaptcha.as_deref() {
            if self.recaptcha.verify(token).await {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(turnstile: Option<&str>, recaptcha: Option<&str>) -> ChallengeTokens {
        ChallengeTokens {
            turnstile: turnstile.map(str::to_string),
            recaptcha: recaptcha.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn absent_tokens_always_fail() {
        let gate = ChallengeGate::new(
            Arc::new(StaticChallenge::passing()),
            Arc::new(StaticChallenge::passing()),
        );
        assert!(!gate.any_passes(&tokens(None, None)).await);
    }

    #[tokio::test]
    async fn one_passing_provider_is_enough() {
        let gate = ChallengeGate::new(
            Arc::new(StaticChallenge::failing()),
            Arc::new(StaticChallenge::passing()),
        );
        assert!(gate.any_passes(&tokens(Some("t"), Some("r"))).await);
        assert!(gate.any_passes(&tokens(None, Some("r"))).await);
        assert!(!gate.any_passes(&tokens(Some("t"), None)).await);
    }

    #[tokio::test]
    async fn all_failing_providers_fail() {
        let gate = ChallengeGate::new(
            Arc::new(StaticChallenge::failing()),
            Arc::new(StaticChallenge::failing()),
        );
        assert!(!gate.any_passes(&tokens(Some("t"), Some("r"))).await);
    }
}
