use axum::{
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
pub struct Health {
    pub name: &'static str,
    pub version: &'static str,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = Health)
    ),
    tag = "sesamo"
)]
pub async fn health() -> impl IntoResponse {
    let body = Json(Health {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    });

    let mut headers = HeaderMap::new();
    if let Ok(value) =
        format!("{}:{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")).parse()
    {
        headers.insert("X-App", value);
    }

    (headers, body)
}
