//! Typed failure taxonomy for the authentication flows.
//!
//! Every operation boundary converts to one of these variants; the
//! [`IntoResponse`] impl is the single place deciding what a client is
//! allowed to learn. Internal diagnostics stay in the server logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("challenge verification failed")]
    ChallengeFailed,

    #[error("email already registered")]
    EmailTaken,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account locked")]
    AccountLocked,

    #[error("email not verified")]
    EmailNotVerified,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("no token")]
    NoToken,

    #[error("invalid or expired reset token")]
    InvalidOrExpiredToken,

    #[error("invalid request")]
    InvalidRequest,

    #[error("too many attempts")]
    RateLimited,

    #[error("password hashing failed")]
    Hashing(#[source] bcrypt::BcryptError),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    /// Client-facing status and message. Enumeration-sensitive causes are
    /// collapsed before this point; unexpected failures collapse here.
    #[must_use]
    pub fn client_parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            Self::ChallengeFailed => (
                StatusCode::BAD_REQUEST,
                "challenge_failed",
                "Captcha verification failed",
            ),
            Self::EmailTaken => (
                StatusCode::CONFLICT,
                "email_taken",
                "Email already registered",
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid credentials",
            ),
            Self::AccountLocked => (
                StatusCode::FORBIDDEN,
                "account_locked",
                "Account locked. Try later.",
            ),
            Self::EmailNotVerified => (
                StatusCode::FORBIDDEN,
                "email_not_verified",
                "Email not verified",
            ),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", "Invalid token"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired", "Token expired"),
            Self::NoToken => (StatusCode::UNAUTHORIZED, "no_token", "No token"),
            Self::InvalidOrExpiredToken => (
                StatusCode::BAD_REQUEST,
                "invalid_or_expired_token",
                "Invalid or expired token",
            ),
            Self::InvalidRequest => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "Invalid request",
            ),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many auth attempts, please try later.",
            ),
            Self::Hashing(_) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "Server error",
            ),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            Self::Hashing(source) => error!("password hashing failed: {source}"),
            Self::Internal(source) => error!("auth operation failed: {source:#}"),
            _ => {}
        }
        let (status, code, message) = self.client_parts();
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::EmailTaken,
            StoreError::Backend(source) => Self::Internal(source),
        }
    }
}
