use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{AuthError, AuthService};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordPayload {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Password replaced; reset token consumed"),
        (status = 400, description = "Invalid request or invalid/expired token")
    ),
    tag = "auth"
)]
pub async fn reset_password(
    Extension(service): Extension<Arc<AuthService>>,
    payload: Option<Json<ResetPasswordPayload>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return AuthError::InvalidRequest.into_response();
    };
    if payload.new_password.is_empty() {
        return AuthError::InvalidRequest.into_response();
    }

    match service
        .reset_password(&payload.email, payload.token.trim(), &payload.new_password)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Password updated" })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
