//! HTTP surface: router construction and the server entry point.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

use crate::auth::{AuthConfig, AuthService, ChallengeGate, RateLimiter};
use crate::mail::Mailer;
use crate::store::PgCredentialStore;

pub mod handlers;

use self::handlers::{
    forgot_password, forgot_password::__path_forgot_password, health, health::__path_health,
    login, login::__path_login, logout, logout::__path_logout, refresh, refresh::__path_refresh,
    register, register::__path_register, reset_password, reset_password::__path_reset_password,
    verify_email, verify_email::__path_verify_email,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        register,
        verify_email,
        login,
        refresh,
        logout,
        forgot_password,
        reset_password
    ),
    components(schemas(
        health::Health,
        register::RegisterPayload,
        verify_email::VerifyEmailPayload,
        login::LoginPayload,
        login::LoginUser,
        login::LoginResponse,
        refresh::RefreshPayload,
        logout::LogoutPayload,
        forgot_password::ForgotPasswordPayload,
        reset_password::ResetPasswordPayload
    )),
    tags(
        (name = "sesamo", description = "Credential issuance and session lifecycle API"),
        (name = "auth", description = "Registration, login, tokens and password reset")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Everything the handlers need, shared through request extensions.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AuthService>,
    pub limiter: Arc<dyn RateLimiter>,
}

#[must_use]
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    Router::new()
        .route("/", get(|| async { "🗝️" }))
        .route("/auth/register", post(handlers::register))
        .route("/auth/verify-email", post(handlers::verify_email))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/forgot-password", post(handlers::forgot_password))
        .route("/auth/reset-password", post(handlers::reset_password))
        .route("/openapi.json", get(|| async { Json(openapi()) }))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state.service))
                .layer(Extension(state.limiter)),
        )
        .route("/health", get(handlers::health).options(handlers::health))
}

/// Connect the credential store and serve the API.
/// # Errors
/// Returns an error if the store is unreachable or the port cannot be bound.
pub async fn new(
    port: u16,
    dsn: String,
    config: AuthConfig,
    challenge: ChallengeGate,
    mailer: Arc<dyn Mailer>,
    limiter: Arc<dyn RateLimiter>,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgCredentialStore::new(pool));
    let service = Arc::new(AuthService::new(config, store, challenge, mailer));
    let app = router(AppState { service, limiter });

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
