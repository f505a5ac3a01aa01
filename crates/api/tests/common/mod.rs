#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use adverify_core::lifecycle::LifecyclePolicy;
use adverify_core::notify::{Notifier, NotifyOutcome};
use adverify_events::NoopNotifier;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use adverify_api::config::{LogFormat, ServerConfig};
use adverify_api::routes;
use adverify_api::state::AppState;

pub const TEST_SECRET: &str = "test-bot-secret";
pub const TEST_BASE_URL: &str = "https://verify.example.com";
pub const TEST_AD_LINK: &str = "https://ads.example.com/landing";

/// Build a test `ServerConfig` with safe defaults.
///
/// Postbacks are disabled; tests that care about them pass their own
/// notifier to [`build_state`].
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        bot_secret: TEST_SECRET.to_string(),
        public_base_url: TEST_BASE_URL.to_string(),
        ad_link: TEST_AD_LINK.to_string(),
        postback: None,
        policy: LifecyclePolicy::default(),
        log_format: LogFormat::Text,
        adjustments: Vec::new(),
    }
}

pub fn build_state(config: ServerConfig, notifier: Arc<dyn Notifier>) -> AppState {
    AppState::new(config, notifier)
}

/// State with the default test config and no postbacks.
pub fn default_state() -> AppState {
    build_state(test_config(), Arc::new(NoopNotifier))
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    routes::app_routes()
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// POST /api/create-token with the test secret and return the token.
pub async fn create_ad_token(app: Router, user_id: i64) -> String {
    let response = post_json(
        app,
        "/api/create-token",
        serde_json::json!({ "user_id": user_id, "secret": TEST_SECRET }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

// ---------------------------------------------------------------------------
// Test notifiers
// ---------------------------------------------------------------------------

/// Records every token it is asked to notify.
#[derive(Default)]
pub struct RecordingNotifier {
    pub tokens: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl RecordingNotifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, token: &str) -> NotifyOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());
        NotifyOutcome::Delivered
    }
}

/// Never finishes; completion must not wait for it.
pub struct HangingNotifier;

#[async_trait]
impl Notifier for HangingNotifier {
    async fn notify(&self, _token: &str) -> NotifyOutcome {
        std::future::pending::<()>().await;
        NotifyOutcome::Delivered
    }
}

/// Wait until `notifier` has seen `expected` calls, or give up after ~2s.
pub async fn wait_for_calls(notifier: &RecordingNotifier, expected: usize) {
    for _ in 0..200 {
        if notifier.calls() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
