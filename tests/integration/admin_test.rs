//! Integration tests for store diagnostics and health.

mod helpers;

use genhub_core::config::ExecutionMode;
use helpers::{ALICE, BOB, TestApp};
use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_listing_shows_jobs_owners_and_stats() {
    let app = TestApp::new(ExecutionMode::Async);

    let id = app.submit("echo", json!({"n": 2}), Some(ALICE)).await.job_id();
    app.wait_for_terminal(&id, Some(ALICE)).await;

    let response = app.request("GET", "/api/admin/jobs", None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let data = &response.body["data"];
    let jobs = data["jobs"].as_array().expect("jobs array");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], id.as_str());
    assert_eq!(jobs[0]["owner"], ALICE);
    assert_eq!(data["owners"][ALICE], json!([id]));
    assert_eq!(data["stats"]["succeeded"], 1);
}

#[tokio::test]
async fn test_stats_count_in_flight_jobs() {
    let app = TestApp::new(ExecutionMode::Async);

    app.submit("held", json!({}), Some(ALICE)).await;
    app.submit("held", json!({}), Some(ALICE)).await;
    app.submit("held", json!({}), Some(BOB)).await;

    let response = app.request("GET", "/api/admin/jobs/stats", None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let stats = &response.body["data"];
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["owners"], 2);
    let in_flight = stats["queued"].as_u64().unwrap_or(0) + stats["running"].as_u64().unwrap_or(0);
    assert_eq!(in_flight, 3);
}

#[tokio::test]
async fn test_remove_job() {
    let app = TestApp::new(ExecutionMode::Async);

    let id = app.submit("echo", json!({"n": 2}), Some(ALICE)).await.job_id();
    app.wait_for_terminal(&id, Some(ALICE)).await;

    let path = format!("/api/admin/jobs/{}", id);
    let response = app.request("DELETE", &path, None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["message"], format!("Job {} removed", id));

    let response = app.request("DELETE", &path, None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.poll(&id, Some(ALICE)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.state.store.stats().await.owners, 0);
}

#[tokio::test]
async fn test_remove_with_malformed_id() {
    let app = TestApp::new(ExecutionMode::Async);

    let response = app
        .request("DELETE", "/api/admin/jobs/not-a-uuid", None, None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_mode_and_job_types() {
    let app = TestApp::new(ExecutionMode::Async);

    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let data = &response.body["data"];
    assert_eq!(data["status"], "ok");
    assert_eq!(data["mode"], "async");
    assert_eq!(data["job_types"], json!(["boom", "echo", "held"]));
}
