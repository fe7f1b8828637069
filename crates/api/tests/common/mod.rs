#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use scenegate_db::{MemoryStore, ThresholdStore};
use scenegate_pipeline::comparison::ComparisonService;
use scenegate_pipeline::orchestrator::DecisionOrchestrator;
use scenegate_pipeline::test_support;
use scenegate_pipeline::thresholds::ThresholdService;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use scenegate_api::config::ServerConfig;
use scenegate_api::router::build_app_router;
use scenegate_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        max_body_bytes: 64 * 1024,
        database_url: None,
    }
}

/// Build the full application router over a fresh [`MemoryStore`].
///
/// Embeddings come from the pipeline's colour stub: `red`, `green`, `blue`
/// and `white` are axis vectors, anything else falls back.
/// Uses [`build_app_router`] so tests exercise the production middleware
/// stack.
pub fn build_test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (build_test_app_with_thresholds(store.clone(), store.clone()), store)
}

/// Like [`build_test_app`] but with threshold configuration read from
/// `thresholds`, for exercising a failing policy store.
pub fn build_test_app_with_thresholds(
    store: Arc<MemoryStore>,
    thresholds: Arc<dyn ThresholdStore>,
) -> Router {
    let pipeline = test_support::config();
    let comparison =
        ComparisonService::new(test_support::embedder(), store.clone(), pipeline.fallback_score);
    let thresholds = ThresholdService::new(thresholds, store.clone());
    let orchestrator = DecisionOrchestrator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        thresholds,
        comparison,
    );

    let config = test_config();
    let state = AppState {
        orchestrator,
        layouts: store.clone(),
        submissions: store.clone(),
        config: Arc::new(config.clone()),
        shutdown: CancellationToken::new(),
    };

    build_app_router(state, &config)
}

/// A layout with the same text in all nine cells.
pub fn uniform(text: &str) -> Value {
    let cells: serde_json::Map<String, Value> = (0..3)
        .flat_map(|r| (0..3).map(move |c| (format!("{r}_{c}"), Value::from(text))))
        .collect();
    Value::Object(cells)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn send_json(app: Router, method: Method, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send_json(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send_json(app, Method::PUT, uri, body).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
