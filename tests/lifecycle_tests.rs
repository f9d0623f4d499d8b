//! Task lifecycle and center-protocol integration tests
//!
//! Runs a mock scheduling center (an axum listener capturing registry
//! and callback traffic) and checks the executor's outbound behavior:
//! heartbeats, exactly-once callbacks, and the full start→callback flow
//! over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::RwLock;
use serde_json::{json, Value};

use jobhub_executor::center::{CenterClient, Registrar};
use jobhub_executor::config::ExecutorConfig;
use jobhub_executor::executor::Executor;
use jobhub_executor::protocol::RunRequest;
use jobhub_executor::{server, Error};

// ─────────────────────────────────────────────────────────────────
// Mock Scheduling Center
// ─────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct CenterState {
    registrations: Arc<RwLock<Vec<Value>>>,
    removals: Arc<RwLock<Vec<Value>>>,
    callbacks: Arc<RwLock<Vec<Value>>>,
}

/// Mock scheduling center capturing everything the executor sends
struct MockCenter {
    addr: SocketAddr,
    state: CenterState,
}

impl MockCenter {
    async fn start() -> Self {
        let state = CenterState::default();

        async fn capture(
            sink: Arc<RwLock<Vec<Value>>>,
            payload: Value,
        ) -> Json<Value> {
            sink.write().push(payload);
            Json(json!({"code": 200}))
        }

        let app = Router::new()
            .route(
                "/api/registry",
                post(|State(s): State<CenterState>, Json(v): Json<Value>| async move {
                    capture(s.registrations, v).await
                }),
            )
            .route(
                "/api/registryRemove",
                post(|State(s): State<CenterState>, Json(v): Json<Value>| async move {
                    capture(s.removals, v).await
                }),
            )
            .route(
                "/api/callback",
                post(|State(s): State<CenterState>, Json(v): Json<Value>| async move {
                    capture(s.callbacks, v).await
                }),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn callbacks(&self) -> Vec<Value> {
        self.state.callbacks.read().clone()
    }

    fn registrations(&self) -> Vec<Value> {
        self.state.registrations.read().clone()
    }

    /// Poll until `count` callbacks arrived or the deadline passes
    async fn wait_for_callbacks(&self, count: usize) -> Vec<Value> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let callbacks = self.callbacks();
            if callbacks.len() >= count {
                return callbacks;
            }
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "expected {} callbacks, got {} before deadline",
                    count,
                    callbacks.len()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

fn executor_against(center: &MockCenter) -> Arc<Executor> {
    let mut config = ExecutorConfig::default();
    config.center.address = center.url();
    config.center.request_timeout_secs = 2;

    let executor = Executor::new(config).unwrap();
    executor.register_fn("quick", |ctx| async move { Ok(format!("ran {}", ctx.job_id)) });
    executor.register_fn("failing", |_ctx| async move {
        Err(Error::Execution("boom".to_string()))
    });
    executor.register_fn("parked", |ctx| async move {
        ctx.cancelled().await;
        Err(Error::Cancelled { job_id: ctx.job_id })
    });
    Arc::new(executor)
}

fn run_request(job_id: i64, handler: &str) -> RunRequest {
    RunRequest {
        job_id,
        executor_handler: handler.to_string(),
        log_id: job_id * 10,
        ..Default::default()
    }
}

// ─────────────────────────────────────────────────────────────────
// Callback Delivery
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_callback_exactly_once_on_success() {
    let center = MockCenter::start().await;
    let executor = executor_against(&center);

    let resp = executor.start_job(run_request(1001, "quick"));
    assert!(resp.is_success());

    let callbacks = center.wait_for_callbacks(1).await;
    assert_eq!(callbacks[0]["jobId"], 1001);
    assert_eq!(callbacks[0]["logId"], 10010);
    assert_eq!(callbacks[0]["code"], 200);
    assert_eq!(callbacks[0]["msg"], "ran 1001");

    // No second report for the same instance
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(center.callbacks().len(), 1);
}

#[tokio::test]
async fn test_callback_carries_failure_code() {
    let center = MockCenter::start().await;
    let executor = executor_against(&center);

    executor.start_job(run_request(1002, "failing"));

    let callbacks = center.wait_for_callbacks(1).await;
    assert_eq!(callbacks[0]["jobId"], 1002);
    assert_eq!(callbacks[0]["code"], 500);
    assert!(callbacks[0]["msg"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_cancelled_body_still_reports() {
    let center = MockCenter::start().await;
    let executor = executor_against(&center);

    executor.start_job(run_request(1003, "parked"));
    assert!(executor.state().is_running(1003));

    let resp = executor.kill_job(jobhub_executor::protocol::KillRequest { job_id: 1003 });
    assert!(resp.is_success());

    // The body observed the token and returned; its continuation still
    // reports, exactly once.
    let callbacks = center.wait_for_callbacks(1).await;
    assert_eq!(callbacks[0]["jobId"], 1003);
    assert_eq!(callbacks[0]["code"], 500);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(center.callbacks().len(), 1);
}

#[tokio::test]
async fn test_timeout_reports_failure() {
    let center = MockCenter::start().await;
    let executor = executor_against(&center);

    let mut request = run_request(1004, "parked");
    request.executor_timeout = 1;
    executor.start_job(request);

    let callbacks = center.wait_for_callbacks(1).await;
    assert_eq!(callbacks[0]["code"], 500);
    assert!(callbacks[0]["msg"].as_str().unwrap().contains("timed out"));
    assert!(!executor.state().is_running(1004));
}

// ─────────────────────────────────────────────────────────────────
// Registrar
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_registrar_beats_immediately_then_periodically() {
    let center = MockCenter::start().await;
    let client = Arc::new(CenterClient::new(center.url(), Duration::from_secs(2)).unwrap());

    let registrar = Arc::new(
        Registrar::new(
            client,
            "test-executors",
            "http://127.0.0.1:9999",
            Duration::from_millis(100),
        )
        .unwrap(),
    );

    let beat = registrar.clone();
    let task = tokio::spawn(async move { beat.run().await });

    // Immediate first beat
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!center.registrations().is_empty());

    // Then one per interval, regardless of prior outcomes
    tokio::time::sleep(Duration::from_millis(450)).await;
    let registrations = center.registrations();
    assert!(
        registrations.len() >= 3,
        "expected periodic heartbeats, got {}",
        registrations.len()
    );

    let first = &registrations[0];
    assert_eq!(first["registryGroup"], "EXECUTOR");
    assert_eq!(first["registryKey"], "test-executors");
    assert_eq!(first["registryValue"], "http://127.0.0.1:9999");

    task.abort();
}

#[tokio::test]
async fn test_registrar_survives_unreachable_center() {
    // Nothing listens on this port; every beat fails
    let client =
        Arc::new(CenterClient::new("http://127.0.0.1:1", Duration::from_millis(100)).unwrap());
    let registrar = Arc::new(
        Registrar::new(
            client,
            "test-executors",
            "http://127.0.0.1:9999",
            Duration::from_millis(50),
        )
        .unwrap(),
    );

    let beat = registrar.clone();
    let task = tokio::spawn(async move { beat.run().await });

    // The loop must still be alive after several failed attempts
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!task.is_finished());
    task.abort();
}

// ─────────────────────────────────────────────────────────────────
// End to End over HTTP
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_over_http_reports_callback() {
    let center = MockCenter::start().await;
    let executor = executor_against(&center);

    // Serve the control surface on an ephemeral port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::router(executor.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Drive it the way the center would
    let http = reqwest::Client::new();
    let resp: Value = http
        .post(format!("http://{}/run", addr))
        .json(&json!({"jobId": 3001, "executorHandler": "quick", "logId": 30010}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["code"], 200);

    let callbacks = center.wait_for_callbacks(1).await;
    assert_eq!(callbacks[0]["jobId"], 3001);
    assert_eq!(callbacks[0]["code"], 200);
}
