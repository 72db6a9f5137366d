use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::cookie::{clear_refresh_cookie, extract_bearer_token, extract_refresh_cookie};
use crate::auth::{AuthError, AuthService};

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct LogoutPayload {
    pub refresh_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutPayload,
    responses(
        (status = 204, description = "Refresh token revoked and cookie cleared"),
        (status = 401, description = "Missing or invalid access token")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    Extension(service): Extension<Arc<AuthService>>,
    payload: Option<Json<LogoutPayload>>,
) -> impl IntoResponse {
    // Logout is the one authenticated flow: the caller proves who they are
    // with a valid access token before touching the stored token set.
    let Some(bearer) = extract_bearer_token(&headers) else {
        return AuthError::NoToken.into_response();
    };
    let claims = match service.authenticate(&bearer) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let token = extract_refresh_cookie(&headers)
        .or_else(|| payload.and_then(|Json(payload)| payload.refresh_token));

    // The cookie is cleared whether or not a token was stored.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_refresh_cookie(service.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }

    match service.logout(claims.sub, token.as_deref()).await {
        Ok(()) => (StatusCode::NO_CONTENT, response_headers).into_response(),
        Err(err) => {
            let mut response = err.into_response();
            response.headers_mut().extend(response_headers);
            response
        }
    }
}
