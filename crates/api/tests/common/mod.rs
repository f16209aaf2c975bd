#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use tower::ServiceExt;
use warden_api::auth::jwt::JwtConfig;
use warden_api::auth::password::PasswordConfig;
use warden_api::config::ServerConfig;
use warden_api::router::build_app_router;
use warden_api::state::AppState;
use warden_core::clock::ManualClock;
use warden_core::credentials::{CredentialPolicy, Credentials};
use warden_db::InMemoryIdentityStore;

pub const ADMIN_LOGIN: &str = "root";
pub const ADMIN_PASSWORD: &str = "bootstrap-admin-password";

/// Build a test `ServerConfig` with safe defaults and the cheapest Argon2 cost.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: None,
        store_timeout_secs: 1,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            algorithm: Algorithm::HS256,
            access_token_expiry_mins: 15,
        },
        password: PasswordConfig::fast_insecure(),
        credentials: CredentialPolicy::default(),
        default_role: "user".to_string(),
        bootstrap_admin: Some(Credentials::new(ADMIN_LOGIN, ADMIN_PASSWORD)),
    }
}

/// A running app plus handles to its collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryIdentityStore>,
    pub clock: Arc<ManualClock>,
    pub state: AppState,
}

impl TestApp {
    /// A fresh clone of the router, for one `oneshot` call.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router over an in-memory store and a manual
/// clock, with the bootstrap admin already created.
///
/// Uses the same middleware stack as `main.rs`.
pub async fn build_test_app() -> TestApp {
    build_test_app_with(test_config()).await
}

pub async fn build_test_app_with(config: ServerConfig) -> TestApp {
    let store = Arc::new(InMemoryIdentityStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let bootstrap = config.bootstrap_admin.clone();

    let state = AppState::build(config, store.clone(), clock.clone(), None)
        .expect("state should build");
    if let Some(credentials) = bootstrap {
        state
            .users
            .ensure_admin(&credentials)
            .await
            .expect("bootstrap admin should be created");
    }

    let router = build_app_router(state.clone()).expect("router should build");
    TestApp {
        router,
        store,
        clock,
        state,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("request should complete")
}

fn json_request(method: &str, uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request should build");
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request("POST", uri, body, None)).await
}

/// POST a raw body with a JSON content type, valid JSON or not.
pub async fn post_raw(app: Router, uri: &str, body: &'static str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("request should build");
    send(app, request).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, json_request("PUT", uri, body, Some(token))).await
}

// ---------------------------------------------------------------------------
// Flow helpers
// ---------------------------------------------------------------------------

/// Sign up a user via the API and return the created user JSON.
pub async fn sign_up(app: Router, login_id: &str, password: &str) -> serde_json::Value {
    let body = serde_json::json!({ "login_id": login_id, "password": password });
    let response = post_json(app, "/api/v1/auth/signup", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await
}

/// Log in via the API and return the access token.
pub async fn login(app: Router, login_id: &str, password: &str) -> String {
    let body = serde_json::json!({ "login_id": login_id, "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let json = body_json(response).await;
    json["access_token"]
        .as_str()
        .expect("access_token should be a string")
        .to_string()
}
