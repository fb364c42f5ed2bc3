#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sepal_api::config::{Backend, ServerConfig};
use sepal_api::router::build_app_router;
use sepal_api::state::AppState;
use sepal_core::handle::JobHandle;
use sepal_core::memory::{MemoryArtifactStore, MemoryJobQueue, MemoryJobStore};
use sepal_pipeline::{JobRunner, NearestCentroidPredictor};
use sepal_worker::config::{load_report_writer, ReportFormat};
use sepal_worker::Worker;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        result_wait_default_secs: 0,
        result_wait_max_secs: 10,
        backend: Backend::Memory,
        database_url: None,
        artifact_dir: PathBuf::from("./artifacts"),
        model_path: None,
        report_format: ReportFormat::Text,
        embedded_workers: 0,
        poll_interval_ms: 10,
        lease_secs: 300,
    }
}

/// The application plus a worker over the same in-memory backend.
///
/// No worker loop runs in the background; tests call
/// [`Worker::run_once`] to move jobs along deterministically.
pub struct TestApp {
    pub app: Router,
    pub worker: Worker,
    pub store: Arc<MemoryJobStore>,
    pub queue: Arc<MemoryJobQueue>,
    pub artifacts: Arc<MemoryArtifactStore>,
}

/// Build the full application router with all middleware layers, backed by
/// in-memory stores.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack that production uses.
pub fn build_test_app() -> TestApp {
    build_test_app_with(ReportFormat::Text)
}

/// [`build_test_app`] rendering reports in `format`.
pub fn build_test_app_with(format: ReportFormat) -> TestApp {
    let config = ServerConfig {
        report_format: format,
        ..test_config()
    };
    let store = Arc::new(MemoryJobStore::new());
    let queue = Arc::new(MemoryJobQueue::new());
    let artifacts = Arc::new(MemoryArtifactStore::new());

    let runner = Arc::new(JobRunner::new(
        store.clone(),
        artifacts.clone(),
        Arc::new(NearestCentroidPredictor::iris()),
        load_report_writer(config.report_format),
    ));
    let worker = Worker::new(queue.clone(), runner);

    let state = AppState {
        jobs: JobHandle::new(store.clone(), queue.clone(), artifacts.clone()),
        config: Arc::new(config.clone()),
    };

    TestApp {
        app: build_app_router(state, &config),
        worker,
        store,
        queue,
        artifacts,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_form(app: Router, uri: &str, body: &str) -> Response<Body> {
    app.oneshot(
        Request::post(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// The four iris measurements, as a JSON submission body.
pub fn setosa_json() -> serde_json::Value {
    serde_json::json!({
        "Sepal length": "4.6",
        "Sepal width": "3.1",
        "Petal length": "1.5",
        "Petal width": "0.2",
    })
}

/// Submit `body` and return the issued job id.
pub async fn submit(app: &Router, body: serde_json::Value) -> String {
    let response = post_json(app.clone(), "/api/v1/predictions", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::ACCEPTED);
    let json = body_json(response).await;
    json["data"]["job_id"].as_str().unwrap().to_string()
}
