use crate::auth::{AuthConfig, ChallengeGate, SlidingWindowLimiter};
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::mail::{LogMailer, Mailer, WebhookMailer};
use crate::sesamo::new;
use anyhow::{Context, Result};
use std::sync::Arc;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port, dsn } => {
            // Fail early on malformed link bases instead of sending broken
            // verification emails later.
            Url::parse(&globals.frontend_url).context("invalid --frontend-url")?;

            let config = AuthConfig::new(
                globals.access_secret.clone(),
                globals.refresh_secret.clone(),
                globals.frontend_url.clone(),
            )
            .with_cookie_secure(!globals.insecure_cookies);

            let challenge = ChallengeGate::from_secrets(
                globals.turnstile_secret.clone(),
                globals.recaptcha_secret.clone(),
            )?;

            let mailer: Arc<dyn Mailer> = match &globals.mail_endpoint {
                Some(endpoint) => Arc::new(WebhookMailer::new(endpoint.clone())?),
                None => Arc::new(LogMailer),
            };

            let limiter = Arc::new(SlidingWindowLimiter::default());

            new(port, dsn, config, challenge, mailer, limiter).await?;
        }
    }

    Ok(())
}
