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

use super::cookie::extract_refresh_cookie;
use crate::auth::AuthService;

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct RefreshPayload {
    /// Fallback for clients that cannot send the cookie.
    pub refresh_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshPayload,
    responses(
        (status = 200, description = "New access token issued"),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    Extension(service): Extension<Arc<AuthService>>,
    payload: Option<Json<RefreshPayload>>,
) -> impl IntoResponse {
    let token = extract_refresh_cookie(&headers)
        .or_else(|| payload.and_then(|Json(payload)| payload.refresh_token));

    match service.refresh(token.as_deref()).await {
        Ok(access_token) => (
            StatusCode::OK,
            Json(json!({ "access_token": access_token })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
