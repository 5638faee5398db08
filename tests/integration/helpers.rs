//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Notify;
use tower::ServiceExt;

use genhub_api::{AppState, build_router};
use genhub_core::config::{AppConfig, ExecutionMode};
use genhub_worker::{JobContext, Processor, ProcessorError, ProcessorRegistry};

/// Owner identity used by most tests.
pub const ALICE: &str = "203.0.113.10";
/// A second, unrelated owner.
pub const BOB: &str = "198.51.100.20";

#[derive(Debug, Serialize, Deserialize)]
pub struct Number {
    pub n: i64,
}

/// Doubles `n`.
pub struct Echo;

#[async_trait]
impl Processor for Echo {
    type Payload = Number;
    type Output = Number;

    async fn process(&self, ctx: &JobContext, payload: Number) -> Result<Number, ProcessorError> {
        ctx.report_progress(50).await;
        Ok(Number { n: payload.n * 2 })
    }
}

/// Always fails like an unreachable upstream.
pub struct Boom;

#[async_trait]
impl Processor for Boom {
    type Payload = Value;
    type Output = Value;

    async fn process(&self, _ctx: &JobContext, _payload: Value) -> Result<Value, ProcessorError> {
        Err(ProcessorError::Upstream("upstream unavailable".to_string()))
    }
}

/// Blocks until the gate is opened.
pub struct Held {
    gate: Arc<Notify>,
}

#[async_trait]
impl Processor for Held {
    type Payload = Value;
    type Output = Value;

    async fn process(&self, _ctx: &JobContext, payload: Value) -> Result<Value, ProcessorError> {
        self.gate.notified().await;
        Ok(payload)
    }
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for direct store inspection
    pub state: AppState,
    /// Opens the `held` processor
    pub gate: Arc<Notify>,
}

impl TestApp {
    /// Create a test application in `mode` with default settings
    pub fn new(mode: ExecutionMode) -> Self {
        Self::with_config(AppConfig::default(), mode)
    }

    /// Create a test application in `mode` with `config`
    pub fn with_config(config: AppConfig, mode: ExecutionMode) -> Self {
        let gate = Arc::new(Notify::new());

        let mut registry = ProcessorRegistry::new();
        registry.register("echo", Echo);
        registry.register("boom", Boom);
        registry.register("held", Held {
            gate: Arc::clone(&gate),
        });

        let state = AppState::new(config, mode, registry);
        let router = build_router(state.clone());
        Self {
            router,
            state,
            gate,
        }
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        owner: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(owner) = owner {
            req = req.header("X-Forwarded-For", format!("{}, 10.0.0.1", owner));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// POST /api/jobs
    pub async fn submit(&self, job_type: &str, payload: Value, owner: Option<&str>) -> TestResponse {
        self.request(
            "POST",
            "/api/jobs",
            Some(serde_json::json!({ "type": job_type, "payload": payload })),
            owner,
        )
        .await
    }

    /// GET /api/jobs/{id}
    pub async fn poll(&self, id: &str, owner: Option<&str>) -> TestResponse {
        self.request("GET", &format!("/api/jobs/{}", id), None, owner)
            .await
    }

    /// Poll until the job reaches a terminal status and return its view.
    pub async fn wait_for_terminal(&self, id: &str, owner: Option<&str>) -> Value {
        for _ in 0..200 {
            let response = self.poll(id, owner).await;
            assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
            let data = &response.body["data"];
            if matches!(data["status"].as_str(), Some("succeeded" | "failed")) {
                return data.clone();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never finished", id);
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// Job id from an async submission
    pub fn job_id(&self) -> String {
        self.body["data"]["job_id"]
            .as_str()
            .expect("No job_id in response")
            .to_string()
    }
}
