#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use workbridge_api::auth::jwt::{generate_access_token, JwtConfig};
use workbridge_api::config::{ServerConfig, StorageConfig};
use workbridge_api::router::build_app_router;
use workbridge_api::sessions::WizardSessions;
use workbridge_api::state::AppState;
use workbridge_core::rate_limit::UploadRateLimiter;
use workbridge_core::signing::UrlSigner;
use workbridge_core::types::DbId;
use workbridge_wizard::memory::{MemoryGateway, MemoryStorage};
use workbridge_wizard::{WizardConfig, WizardDeps};

pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";
const BOUNDARY: &str = "workbridge-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        storage: StorageConfig {
            root: "unused".into(),
            signing_secret: TEST_SECRET.to_string(),
        },
        wizard: WizardConfig::default(),
        upload_rate_limit: 5,
        upload_rate_window: Duration::from_secs(60),
        session_idle_timeout: Duration::from_secs(1800),
        maintenance_interval: Duration::from_secs(60),
    }
}

/// The application plus handles on its in-memory backends.
pub struct TestApp {
    pub app: Router,
    pub gateway: Arc<MemoryGateway>,
    pub storage: Arc<MemoryStorage>,
}

/// Build the full application router over the in-memory gateway and storage.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let signer = UrlSigner::new(config.storage.signing_secret.clone().into_bytes(), "/files");
    let gateway = Arc::new(MemoryGateway::new());
    let storage = Arc::new(MemoryStorage::new(signer.clone()));

    let deps = WizardDeps {
        gateway: gateway.clone(),
        storage: storage.clone(),
        limiter: Arc::new(UploadRateLimiter::new(
            config.upload_rate_limit,
            config.upload_rate_window,
        )),
        config: config.wizard.clone(),
    };

    let state = AppState {
        pool: None,
        config: Arc::new(config.clone()),
        sessions: Arc::new(WizardSessions::new(deps)),
        storage: storage.clone(),
        signer,
    };

    TestApp {
        app: build_app_router(state, &config),
        gateway,
        storage,
    }
}

pub fn token(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).unwrap()
}

pub fn worker_token(user_id: DbId) -> String {
    token(user_id, "worker")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn send_json_auth(
    app: &Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send_json_auth(app, Method::POST, uri, body, token).await
}

pub async fn put_json_auth(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send_json_auth(app, Method::PUT, uri, body, token).await
}

pub async fn delete_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// POST a multipart body with a single `file` field.
pub async fn upload_auth(
    app: &Router,
    uri: &str,
    file_name: &str,
    bytes: &[u8],
    token: &str,
) -> Response<Body> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
