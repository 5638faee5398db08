//! Integration tests for inline execution.

mod helpers;

use genhub_core::config::{AppConfig, ExecutionMode};
use helpers::{ALICE, TestApp};
use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_result_is_returned_inline() {
    let app = TestApp::new(ExecutionMode::Sync);

    let response = app.submit("echo", json!({"n": 21}), Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["mode"], "sync");
    assert_eq!(response.body["data"]["result"], json!({"n": 42}));

    assert_eq!(app.state.store.stats().await.total, 0);
}

#[tokio::test]
async fn test_processor_failure_is_a_gateway_error() {
    let app = TestApp::new(ExecutionMode::Sync);

    let response = app.submit("boom", json!({}), Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["error"], "UPSTREAM_ERROR");
    assert_eq!(response.body["message"], "upstream unavailable");
}

#[tokio::test]
async fn test_inline_runs_ignore_the_owner_ceiling() {
    let mut config = AppConfig::default();
    config.jobs.max_concurrent_per_owner = 1;
    let app = TestApp::with_config(config, ExecutionMode::Sync);

    for n in 0..3 {
        let response = app.submit("echo", json!({"n": n}), Some(ALICE)).await;
        assert_eq!(response.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_validation_still_applies() {
    let app = TestApp::new(ExecutionMode::Sync);

    let response = app.submit("teleport", json!({}), None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.submit("echo", json!({}), None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_sync_mode() {
    let app = TestApp::new(ExecutionMode::Sync);

    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.body["data"]["mode"], "sync");
}
