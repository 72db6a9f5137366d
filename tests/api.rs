//! End-to-end tests over the router with the in-memory credential store.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use sesamo::auth::{
    AuthConfig, AuthService, ChallengeGate, NoopRateLimiter, RateLimiter, SlidingWindowLimiter,
    StaticChallenge,
};
use sesamo::mail::LogMailer;
use sesamo::sesamo::{router, AppState};
use sesamo::store::{CredentialStore, MemoryCredentialStore};

fn test_config() -> AuthConfig {
    AuthConfig::new(
        SecretString::from("access-secret".to_string()),
        SecretString::from("refresh-secret".to_string()),
        "http://localhost:5173".to_string(),
    )
    .with_bcrypt_cost(10)
    .with_cookie_secure(false)
}

fn app_with_limiter(limiter: Arc<dyn RateLimiter>) -> (Router, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::new());
    let gate = ChallengeGate::new(
        Arc::new(StaticChallenge::passing()),
        Arc::new(StaticChallenge::passing()),
    );
    let service = Arc::new(AuthService::new(
        test_config(),
        store.clone(),
        gate,
        Arc::new(LogMailer),
    ));
    (router(AppState { service, limiter }), store)
}

fn app() -> (Router, Arc<MemoryCredentialStore>) {
    app_with_limiter(Arc::new(NoopRateLimiter))
}

async fn post_json(
    app: &Router,
    path: &str,
    body: Value,
    extra_headers: &[(header::HeaderName, String)],
) -> axum::response::Response {
    let mut request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in extra_headers {
        request = request.header(name, value);
    }
    let request = request
        .body(Body::from(body.to_string()))
        .expect("request");
    app.clone().oneshot(request).await.expect("response")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn refresh_cookie_from(response: &axum::response::Response) -> String {
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .expect("ascii cookie");
    assert!(cookie.starts_with("sesamo_refresh="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

fn register_body(email: &str) -> Value {
    json!({
        "name": "A",
        "email": email,
        "password": "Pw1!",
        "turnstile_token": "client-token",
    })
}

fn login_body(email: &str, password: &str) -> Value {
    json!({
        "email": email,
        "password": password,
        "turnstile_token": "client-token",
    })
}

async fn stored_verify_token(store: &MemoryCredentialStore, email: &str) -> String {
    store
        .find_by_email(email)
        .await
        .expect("find")
        .expect("account")
        .email_verify_token
        .expect("verify token")
}

#[tokio::test]
async fn register_verify_login_refresh_logout_roundtrip() {
    let (app, store) = app();

    // Register: acknowledged, token only in the email channel.
    let response = post_json(&app, "/auth/register", register_body("a@x.com"), &[]).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["message"].as_str().expect("message").contains("verify"));

    // Login before verification is denied.
    let response = post_json(&app, "/auth/login", login_body("a@x.com", "Pw1!"), &[]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "email_not_verified");

    // Verify with the stored token.
    let token = stored_verify_token(&store, "a@x.com").await;
    let response = post_json(
        &app,
        "/auth/verify-email",
        json!({ "email": "a@x.com", "token": token }),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Login now issues an access token and the refresh cookie.
    let response = post_json(&app, "/auth/login", login_body("a@x.com", "Pw1!"), &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = refresh_cookie_from(&response);
    let body = body_json(response).await;
    let access_token = body["access_token"].as_str().expect("access token").to_string();
    assert!(!access_token.is_empty());
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["name"], "A");

    // Refresh through the cookie mints a new access token.
    let response = post_json(
        &app,
        "/auth/refresh",
        json!({}),
        &[(header::COOKIE, cookie.clone())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["access_token"].is_string());

    // Logout requires the access token and clears the cookie.
    let response = post_json(
        &app,
        "/auth/logout",
        json!({}),
        &[
            (header::COOKIE, cookie.clone()),
            (header::AUTHORIZATION, format!("Bearer {access_token}")),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie")
        .to_str()
        .expect("ascii");
    assert!(cleared.contains("Max-Age=0"));

    // The revoked refresh token is dead.
    let response = post_json(&app, "/auth/refresh", json!({}), &[(header::COOKIE, cookie)]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (app, _store) = app();

    let response = post_json(&app, "/auth/register", register_body("a@x.com"), &[]).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(&app, "/auth/register", register_body("A@X.COM"), &[]).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "email_taken");
}

#[tokio::test]
async fn register_validates_the_payload() {
    let (app, _store) = app();

    let response = post_json(
        &app,
        "/auth/register",
        json!({ "email": "not-an-email", "password": "Pw1!", "turnstile_token": "t" }),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        "/auth/register",
        json!({ "email": "a@x.com", "password": "", "turnstile_token": "t" }),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_challenge_token_fails_closed() {
    let (app, _store) = app();

    let response = post_json(
        &app,
        "/auth/register",
        json!({ "email": "a@x.com", "password": "Pw1!" }),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "challenge_failed");
}

#[tokio::test]
async fn login_masks_unknown_accounts() {
    let (app, _store) = app();

    let response = post_json(&app, "/auth/login", login_body("ghost@x.com", "Pw1!"), &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_credentials");
}

#[tokio::test]
async fn shared_rate_limit_budget_covers_the_three_flows() {
    let limiter = Arc::new(SlidingWindowLimiter::new(3, Duration::from_secs(900)));
    let (app, _store) = app_with_limiter(limiter);
    let client = [(
        axum::http::HeaderName::from_static("x-forwarded-for"),
        "203.0.113.7".to_string(),
    )];

    let response = post_json(&app, "/auth/register", register_body("a@x.com"), &client).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = post_json(&app, "/auth/login", login_body("a@x.com", "nope"), &client).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = post_json(
        &app,
        "/auth/forgot-password",
        json!({ "email": "a@x.com" }),
        &client,
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // Fourth attempt from the same address exhausts the shared budget.
    let response = post_json(&app, "/auth/login", login_body("a@x.com", "nope"), &client).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different address still has its own budget.
    let other = [(
        axum::http::HeaderName::from_static("x-forwarded-for"),
        "198.51.100.9".to_string(),
    )];
    let response = post_json(&app, "/auth/login", login_body("a@x.com", "nope"), &other).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forgot_password_acknowledges_unknown_accounts() {
    let (app, _store) = app();

    let response = post_json(
        &app,
        "/auth/forgot-password",
        json!({ "email": "ghost@x.com" }),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // Identical acknowledgment for a malformed address.
    let response = post_json(
        &app,
        "/auth/forgot-password",
        json!({ "email": "not-an-email" }),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn reset_password_flow_over_http() {
    let (app, store) = app();

    let response = post_json(&app, "/auth/register", register_body("a@x.com"), &[]).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let token = stored_verify_token(&store, "a@x.com").await;
    let response = post_json(
        &app,
        "/auth/verify-email",
        json!({ "email": "a@x.com", "token": token }),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        &app,
        "/auth/forgot-password",
        json!({ "email": "a@x.com" }),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let reset_token = store
        .find_by_email("a@x.com")
        .await
        .expect("find")
        .expect("account")
        .reset_password_token
        .expect("reset token");

    let response = post_json(
        &app,
        "/auth/reset-password",
        json!({ "email": "a@x.com", "token": "wrong", "new_password": "New1!" }),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        "/auth/reset-password",
        json!({ "email": "a@x.com", "token": reset_token, "new_password": "New1!" }),
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Old password is dead, the new one logs in.
    let response = post_json(&app, "/auth/login", login_body("a@x.com", "Pw1!"), &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = post_json(&app, "/auth/login", login_body("a@x.com", "New1!"), &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_requires_an_access_token() {
    let (app, _store) = app();

    let response = post_json(&app, "/auth/logout", json!({}), &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        &app,
        "/auth/logout",
        json!({}),
        &[(header::AUTHORIZATION, "Bearer not-a-jwt".to_string())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_and_openapi_are_served() {
    let (app, _store) = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "sesamo");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]["/auth/login"].is_object());
}
