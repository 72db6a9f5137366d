//! Outbound email delivery abstraction.
//!
//! Delivery failures never abort the operation that requested the email;
//! callers dispatch sends as fire-and-forget tasks and the outcome is only
//! observable in the logs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::APP_USER_AGENT;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error for the caller to log.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        info!(to_email = %to, subject = %subject, body = %html_body, "mail send stub");
        Ok(())
    }
}

/// Posts messages as JSON to a delivery endpoint (relay, function, queue).
pub struct WebhookMailer {
    client: Client,
    endpoint: String,
}

impl WebhookMailer {
    pub fn new(endpoint: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build mail HTTP client")?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "to": to,
                "subject": subject,
                "html": html_body,
            }))
            .send()
            .await
            .context("failed to reach mail endpoint")?;

        if !response.status().is_success() {
            anyhow::bail!("mail endpoint returned status {}", response.status());
        }
        Ok(())
    }
}
