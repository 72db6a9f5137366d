//! The authentication state machine and its building blocks.

pub mod challenge;
pub mod config;
pub mod error;
pub mod lockout;
pub mod one_time;
pub mod password;
pub mod rate_limit;
pub mod service;
pub mod tokens;

pub use self::challenge::{ChallengeGate, ChallengeOracle, ChallengeTokens, StaticChallenge};
pub use self::config::AuthConfig;
pub use self::error::AuthError;
pub use self::rate_limit::{
    NoopRateLimiter, RateLimitAction, RateLimitDecision, RateLimiter, SlidingWindowLimiter,
};
pub use self::service::{
    normalize_email, valid_email, AuthService, IssuedSession, LoginRequest, RegisterRequest,
    VerifyOutcome,
};
pub use self::tokens::{AccessClaims, RefreshClaims, TokenCodec, TokenError};
