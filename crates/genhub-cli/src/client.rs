//! Thin HTTP client for the GenHub API.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use genhub_core::error::{AppError, ErrorKind};

/// Talks to a running server's `/api` routes.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET `path` and unwrap the `data` field.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let request = self.client.get(self.url(path));
        self.send(request).await
    }

    /// POST a JSON body to `path` and unwrap the `data` field.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let request = self.client.post(self.url(path)).json(body);
        self.send(request).await
    }

    /// DELETE `path` and unwrap the `data` field.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let request = self.client.delete(self.url(path));
        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        let response = request.send().await.map_err(|e| {
            AppError::service_unavailable(format!("Cannot reach {}: {e}", self.base_url))
        })?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::external_service(format!("Unreadable response: {e}")))?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            return Err(AppError::new(kind_for(status.as_u16()), message));
        }

        let data = body.get("data").cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(data)?)
    }
}

fn kind_for(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::Validation,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimit,
        502 => ErrorKind::ExternalService,
        504 | 408 => ErrorKind::Timeout,
        503 => ErrorKind::ServiceUnavailable,
        _ => ErrorKind::Internal,
    }
}
