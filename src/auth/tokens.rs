//! Signed bearer token codec.
//!
//! Two independent signing contexts: short-lived access tokens carrying
//! identity and roles, and long-lived refresh tokens carrying only the
//! account id. Each context has its own secret, so leaking one never
//! compromises the other.

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::config::AuthConfig;
use super::error::AuthError;
use crate::store::Account;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Correctly signed but past its expiry. Kept distinct from tampering
    /// for observability; both are rejected for authorization.
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Invalid => Self::InvalidToken,
            TokenError::Signing(source) => Self::Internal(source.into()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    /// Unique per issuance so two same-second logins never mint the same
    /// token string; revocation removes exactly one stored entry.
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenCodec {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let access_secret = config.access_secret().expose_secret().as_bytes();
        let refresh_secret = config.refresh_secret().expose_secret().as_bytes();
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            access_ttl_seconds: config.access_ttl_seconds(),
            refresh_ttl_seconds: config.refresh_ttl_seconds(),
        }
    }

    pub fn issue_access(&self, account: &Account) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: account.id,
            email: account.email_normalized.clone(),
            roles: account.roles.clone(),
            iat: now,
            exp: now + self.access_ttl_seconds,
        };
        encode(&Header::default(), &claims, &self.access_encoding).map_err(TokenError::Signing)
    }

    pub fn issue_refresh(&self, account_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: account_id,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + self.refresh_ttl_seconds,
        };
        encode(&Header::default(), &claims, &self.refresh_encoding).map_err(TokenError::Signing)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(token, &self.access_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(map_verify_error)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(map_verify_error)
    }
}

fn map_verify_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    }
}
