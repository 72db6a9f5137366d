use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;

use super::extract_client_ip;
use crate::auth::{
    normalize_email, valid_email, AuthError, AuthService, ChallengeTokens, RateLimitAction,
    RateLimitDecision, RateLimiter, RegisterRequest,
};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterPayload {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    pub turnstile_token: Option<String>,
    pub recaptcha_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterPayload,
    responses(
        (status = 201, description = "Account created; verification email queued"),
        (status = 400, description = "Validation or challenge failure"),
        (status = 409, description = "Email already registered"),
        (status = 429, description = "Rate limited")
    ),
    tag = "auth"
)]
pub async fn register(
    headers: HeaderMap,
    Extension(service): Extension<Arc<AuthService>>,
    Extension(limiter): Extension<Arc<dyn RateLimiter>>,
    payload: Option<Json<RegisterPayload>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return AuthError::InvalidRequest.into_response();
    };

    let email_normalized = normalize_email(&payload.email);
    if !valid_email(&email_normalized) || payload.password.is_empty() {
        return AuthError::InvalidRequest.into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if limiter.check(client_ip.as_deref(), RateLimitAction::Register) == RateLimitDecision::Limited
    {
        return AuthError::RateLimited.into_response();
    }

    let request = RegisterRequest {
        name: payload.name.filter(|name| !name.trim().is_empty()),
        email: payload.email,
        password: payload.password,
        challenge: ChallengeTokens {
            turnstile: payload.turnstile_token,
            recaptcha: payload.recaptcha_token,
        },
    };

    match service.register(request).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(json!({ "message": "Registered. Check email to verify." })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
