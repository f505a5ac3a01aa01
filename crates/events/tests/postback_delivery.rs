//! Postback delivery against a local stand-in for the reward network.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use adverify_core::notify::{Notifier, NotifyOutcome};
use adverify_events::{PostbackConfig, PostbackError, PostbackNotifier};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

/// Records every hit so tests can assert on attempts and forwarded tokens.
#[derive(Clone, Default)]
struct Network {
    hits: Arc<AtomicUsize>,
    tokens: Arc<Mutex<Vec<String>>>,
}

impl Network {
    fn record(&self, params: &HashMap<String, String>) -> usize {
        if let Some(token) = params.get("token") {
            self.tokens.lock().unwrap().push(token.clone());
        }
        self.hits.fetch_add(1, Ordering::SeqCst) + 1
    }
}

async fn ok(State(net): State<Network>, Query(params): Query<HashMap<String, String>>) -> StatusCode {
    net.record(&params);
    StatusCode::OK
}

async fn fail(State(net): State<Network>, Query(params): Query<HashMap<String, String>>) -> StatusCode {
    net.record(&params);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Fails the first two attempts, then accepts.
async fn flaky(State(net): State<Network>, Query(params): Query<HashMap<String, String>>) -> StatusCode {
    if net.record(&params) <= 2 {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    }
}

async fn slow(State(net): State<Network>, Query(params): Query<HashMap<String, String>>) -> StatusCode {
    net.record(&params);
    tokio::time::sleep(Duration::from_secs(5)).await;
    StatusCode::OK
}

async fn spawn_network() -> (SocketAddr, Network) {
    let network = Network::default();
    let app = Router::new()
        .route("/ok", get(ok))
        .route("/fail", get(fail))
        .route("/flaky", get(flaky))
        .route("/slow", get(slow))
        .with_state(network.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, network)
}

fn notifier(addr: SocketAddr, path: &str, max_retries: u32, timeout: Duration) -> PostbackNotifier {
    PostbackNotifier::new(PostbackConfig {
        url_template: format!("http://{addr}{path}?token={{token}}&status=completed"),
        timeout,
        max_retries,
        retry_base: Duration::from_millis(10),
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Test: successful delivery forwards the token once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delivered_postback_carries_token() {
    let (addr, network) = spawn_network().await;
    let notifier = notifier(addr, "/ok", 0, Duration::from_secs(5));

    let outcome = notifier.notify("tok-123").await;

    assert_eq!(outcome, NotifyOutcome::Delivered);
    assert_eq!(network.hits.load(Ordering::SeqCst), 1);
    assert_eq!(*network.tokens.lock().unwrap(), vec!["tok-123".to_string()]);
}

// ---------------------------------------------------------------------------
// Test: non-2xx is a failure and, by default, is not retried
// ---------------------------------------------------------------------------

#[tokio::test]
async fn server_error_fails_after_single_attempt() {
    let (addr, network) = spawn_network().await;
    let notifier = notifier(addr, "/fail", 0, Duration::from_secs(5));

    let result = notifier.deliver("tok").await;
    assert!(matches!(result, Err(PostbackError::HttpStatus(500))));
    assert_eq!(network.hits.load(Ordering::SeqCst), 1);

    assert_eq!(notifier.notify("tok").await, NotifyOutcome::Failed);
}

// ---------------------------------------------------------------------------
// Test: bounded retry recovers from transient failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn retry_recovers_from_transient_failures() {
    let (addr, network) = spawn_network().await;
    let notifier = notifier(addr, "/flaky", 3, Duration::from_secs(5));

    assert_eq!(notifier.notify("tok").await, NotifyOutcome::Delivered);
    assert_eq!(network.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_budget_is_respected() {
    let (addr, network) = spawn_network().await;
    let notifier = notifier(addr, "/fail", 2, Duration::from_secs(5));

    assert_eq!(notifier.notify("tok").await, NotifyOutcome::Failed);
    assert_eq!(network.hits.load(Ordering::SeqCst), 3);
}

// ---------------------------------------------------------------------------
// Test: a slow endpoint is cut off by the timeout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_endpoint_times_out() {
    let (addr, _network) = spawn_network().await;
    let notifier = notifier(addr, "/slow", 0, Duration::from_millis(200));

    let started = std::time::Instant::now();
    let outcome = notifier.notify("tok").await;

    assert_eq!(outcome, NotifyOutcome::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(3));
}

// ---------------------------------------------------------------------------
// Test: unreachable endpoint is a failure, not a panic
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_endpoint_fails() {
    // Bind and immediately drop to get a port nobody listens on.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let notifier = notifier(addr, "/ok", 0, Duration::from_secs(2));

    assert_eq!(notifier.notify("tok").await, NotifyOutcome::Failed);
}
