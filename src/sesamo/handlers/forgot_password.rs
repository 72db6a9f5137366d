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
    normalize_email, valid_email, AuthError, AuthService, RateLimitAction, RateLimitDecision,
    RateLimiter,
};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordPayload {
    pub email: String,
}

/// The acknowledgment is identical whether or not the account exists; the
/// only divergent answer is the rate limit.
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordPayload,
    responses(
        (status = 202, description = "Acknowledged; a reset email may have been sent"),
        (status = 429, description = "Rate limited")
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    headers: HeaderMap,
    Extension(service): Extension<Arc<AuthService>>,
    Extension(limiter): Extension<Arc<dyn RateLimiter>>,
    payload: Option<Json<ForgotPasswordPayload>>,
) -> impl IntoResponse {
    let client_ip = extract_client_ip(&headers);
    if limiter.check(client_ip.as_deref(), RateLimitAction::ForgotPassword)
        == RateLimitDecision::Limited
    {
        return AuthError::RateLimited.into_response();
    }

    let acknowledged = (
        StatusCode::ACCEPTED,
        Json(json!({ "message": "If the account exists, a reset email is on its way." })),
    );

    let Some(Json(payload)) = payload else {
        return acknowledged.into_response();
    };
    if !valid_email(&normalize_email(&payload.email)) {
        return acknowledged.into_response();
    }

    match service.forgot_password(&payload.email).await {
        Ok(()) => acknowledged.into_response(),
        Err(err) => err.into_response(),
    }
}
