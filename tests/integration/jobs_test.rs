//! Integration tests for async submission and polling.

mod helpers;

use genhub_core::config::{AppConfig, ExecutionMode};
use genhub_core::types::JobId;
use helpers::{ALICE, BOB, TestApp};
use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_submit_returns_job_id_and_job_succeeds() {
    let app = TestApp::new(ExecutionMode::Async);

    let response = app.submit("echo", json!({"n": 5}), Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body["data"]["mode"], "async");

    let id = response.job_id();
    let job = app.wait_for_terminal(&id, Some(ALICE)).await;
    assert_eq!(job["status"], "succeeded");
    assert_eq!(job["type"], "echo");
    assert_eq!(job["progress"], 100);
    assert_eq!(job["result"], json!({"n": 10}));
    assert!(job["error"].is_null());
}

#[tokio::test]
async fn test_failed_job_reports_error() {
    let app = TestApp::new(ExecutionMode::Async);

    let id = app.submit("boom", json!({}), Some(ALICE)).await.job_id();
    let job = app.wait_for_terminal(&id, Some(ALICE)).await;

    assert_eq!(job["status"], "failed");
    assert_eq!(job["error"], "upstream unavailable");
    assert!(job["result"].is_null());
}

#[tokio::test]
async fn test_owner_ceiling_is_enforced() {
    let app = TestApp::new(ExecutionMode::Async);

    for _ in 0..3 {
        let response = app.submit("held", json!({}), Some(ALICE)).await;
        assert_eq!(response.status, StatusCode::ACCEPTED);
    }

    let response = app.submit("held", json!({}), Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["error"], "RATE_LIMITED");

    // Other owners and anonymous callers are unaffected.
    let response = app.submit("held", json!({}), Some(BOB)).await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    let response = app.submit("held", json!({}), None).await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    let stats = app.state.store.stats().await;
    assert_eq!(stats.total, 5);
}

#[tokio::test]
async fn test_finished_jobs_free_capacity() {
    let mut config = AppConfig::default();
    config.jobs.max_concurrent_per_owner = 1;
    let app = TestApp::with_config(config, ExecutionMode::Async);

    let id = app.submit("echo", json!({"n": 1}), Some(ALICE)).await.job_id();
    app.wait_for_terminal(&id, Some(ALICE)).await;

    let response = app.submit("echo", json!({"n": 2}), Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_jobs_are_hidden_from_other_owners() {
    let app = TestApp::new(ExecutionMode::Async);

    let id = app.submit("echo", json!({"n": 1}), Some(ALICE)).await.job_id();

    let response = app.poll(&id, Some(BOB)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let response = app.poll(&id, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.poll(&id, Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_jobs_are_visible_to_everyone() {
    let app = TestApp::new(ExecutionMode::Async);

    let id = app.submit("echo", json!({"n": 1}), None).await.job_id();

    let response = app.poll(&id, Some(BOB)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_type_is_rejected() {
    let app = TestApp::new(ExecutionMode::Async);

    let response = app.submit("teleport", json!({}), Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");

    let response = app.submit("", json!({}), Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.state.store.stats().await.total, 0);
}

#[tokio::test]
async fn test_bad_payload_is_rejected_before_storing() {
    let app = TestApp::new(ExecutionMode::Async);

    let response = app.submit("echo", json!({"n": "five"}), Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.state.store.stats().await.total, 0);
}

#[tokio::test]
async fn test_poll_unknown_and_malformed_ids() {
    let app = TestApp::new(ExecutionMode::Async);

    let response = app.poll(&JobId::new().to_string(), Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.poll("not-a-uuid", Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
