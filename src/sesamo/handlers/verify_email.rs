use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthError, AuthService, VerifyOutcome};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyEmailPayload {
    pub email: String,
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/auth/verify-email",
    request_body = VerifyEmailPayload,
    responses(
        (status = 200, description = "Email verified (or already was)"),
        (status = 400, description = "Unknown account"),
        (status = 401, description = "Token mismatch")
    ),
    tag = "auth"
)]
pub async fn verify_email(
    Extension(service): Extension<Arc<AuthService>>,
    payload: Option<Json<VerifyEmailPayload>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return AuthError::InvalidRequest.into_response();
    };

    match service.verify_email(&payload.email, payload.token.trim()).await {
        Ok(VerifyOutcome::Verified) => (
            StatusCode::OK,
            Json(json!({ "message": "Email verified" })),
        )
            .into_response(),
        Ok(VerifyOutcome::AlreadyVerified) => (
            StatusCode::OK,
            Json(json!({ "message": "Already verified" })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
