use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::cookie::refresh_cookie;
use super::extract_client_ip;
use crate::auth::{
    AuthError, AuthService, ChallengeTokens, LoginRequest, RateLimitAction, RateLimitDecision,
    RateLimiter,
};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
    pub turnstile_token: Option<String>,
    pub recaptcha_token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginUser {
    pub email: String,
    pub name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: LoginUser,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Access token issued; refresh token set as cookie", body = LoginResponse),
        (status = 400, description = "Validation or challenge failure"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account locked or email not verified"),
        (status = 429, description = "Rate limited")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    Extension(service): Extension<Arc<AuthService>>,
    Extension(limiter): Extension<Arc<dyn RateLimiter>>,
    payload: Option<Json<LoginPayload>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return AuthError::InvalidRequest.into_response();
    };

    let client_ip = extract_client_ip(&headers);
    if limiter.check(client_ip.as_deref(), RateLimitAction::Login) == RateLimitDecision::Limited {
        return AuthError::RateLimited.into_response();
    }

    let request = LoginRequest {
        email: payload.email,
        password: payload.password,
        challenge: ChallengeTokens {
            turnstile: payload.turnstile_token,
            recaptcha: payload.recaptcha_token,
        },
    };

    match service.login(request).await {
        Ok(session) => {
            let mut response_headers = HeaderMap::new();
            match refresh_cookie(service.config(), &session.refresh_token) {
                Ok(cookie) => {
                    response_headers.insert(SET_COOKIE, cookie);
                }
                Err(err) => {
                    // The refresh token is only usable through the cookie;
                    // failing to build it has to fail the login.
                    error!("failed to build refresh cookie: {err}");
                    return AuthError::Internal(err.into()).into_response();
                }
            }
            (
                StatusCode::OK,
                response_headers,
                Json(LoginResponse {
                    access_token: session.access_token,
                    user: LoginUser {
                        email: session.email,
                        name: session.name,
                    },
                }),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}
