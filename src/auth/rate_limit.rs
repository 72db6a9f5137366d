//! Per-client-address rate limiting for the unauthenticated auth flows.
//!
//! This budget is shared across register, login and forgot-password and is
//! independent of the per-account lockout: one defense keyed by client
//! address, the other by account.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// 10 attempts per 15 minutes.
const DEFAULT_MAX_ATTEMPTS: usize = 10;
const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Clients without a resolvable address share one bucket.
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone, Copy, Debug)]
pub enum RateLimitAction {
    Register,
    Login,
    ForgotPassword,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// In-memory sliding window over attempt timestamps.
pub struct SlidingWindowLimiter {
    max_attempts: usize,
    window: Duration,
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW)
    }
}

impl SlidingWindowLimiter {
    #[must_use]
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        let key = ip.unwrap_or(UNKNOWN_CLIENT).to_string();
        let now = Instant::now();
        let mut attempts = self.attempts.lock().expect("rate limiter mutex poisoned");
        let entry = attempts.entry(key).or_default();
        entry.retain(|at| now.duration_since(*at) < self.window);
        if entry.len() >= self.max_attempts {
            debug!(?action, "rate limit exceeded");
            return RateLimitDecision::Limited;
        }
        entry.push(now);
        RateLimitDecision::Allowed
    }
}
