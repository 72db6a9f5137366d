//! Startup configuration for the auth orchestrator and token codec.
//!
//! Constructed once in the server action and passed down explicitly; nothing
//! in the flows reads the environment.

use secrecy::SecretString;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_BCRYPT_COST: u32 = 12;
const MIN_BCRYPT_COST: u32 = 10;
const DEFAULT_LOCKOUT_THRESHOLD: i32 = 5;
const DEFAULT_LOCKOUT_SECONDS: i64 = 30 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    access_secret: SecretString,
    refresh_secret: SecretString,
    frontend_base_url: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    bcrypt_cost: u32,
    lockout_threshold: i32,
    lockout_seconds: i64,
    reset_token_ttl_seconds: i64,
    cookie_secure: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(
        access_secret: SecretString,
        refresh_secret: SecretString,
        frontend_base_url: String,
    ) -> Self {
        Self {
            access_secret,
            refresh_secret,
            frontend_base_url,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_seconds: DEFAULT_LOCKOUT_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            cookie_secure: true,
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub fn with_lockout_threshold(mut self, threshold: i32) -> Self {
        self.lockout_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_lockout_seconds(mut self, seconds: i64) -> Self {
        self.lockout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Clamp out-of-range values instead of failing startup.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if self.bcrypt_cost < MIN_BCRYPT_COST {
            self.bcrypt_cost = MIN_BCRYPT_COST;
        }
        if self.access_ttl_seconds < 1 {
            self.access_ttl_seconds = DEFAULT_ACCESS_TTL_SECONDS;
        }
        if self.refresh_ttl_seconds < 1 {
            self.refresh_ttl_seconds = DEFAULT_REFRESH_TTL_SECONDS;
        }
        if self.lockout_threshold < 1 {
            self.lockout_threshold = DEFAULT_LOCKOUT_THRESHOLD;
        }
        self
    }

    #[must_use]
    pub fn access_secret(&self) -> &SecretString {
        &self.access_secret
    }

    #[must_use]
    pub fn refresh_secret(&self) -> &SecretString {
        &self.refresh_secret
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    #[must_use]
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }

    #[must_use]
    pub fn lockout_threshold(&self) -> i32 {
        self.lockout_threshold
    }

    #[must_use]
    pub fn lockout_seconds(&self) -> i64 {
        self.lockout_seconds
    }

    #[must_use]
    pub fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}
