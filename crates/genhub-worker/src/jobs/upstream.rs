//! Client for the upstream image-model service.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use genhub_core::config::UpstreamConfig;
use genhub_entity::job::GeneratedImage;

/// Errors from the upstream service.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("Upstream error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The service answered 2xx with a body we cannot use.
    #[error("Unexpected upstream response: {0}")]
    Malformed(String),
}

/// Parameters for one generated image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateParams<'a> {
    /// Model to use.
    pub model: &'a str,
    /// Text prompt.
    pub prompt: &'a str,
    /// Optional style preset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<&'a str>,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

/// Parameters for fusing source images.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuseParams<'a> {
    /// Model to use.
    pub model: &'a str,
    /// Source images as URLs or data URIs.
    pub images: &'a [String],
    /// Prompt steering the fusion, derived from the sources' description.
    pub prompt: &'a str,
    /// Blend strength, 0.0-1.0.
    pub strength: f32,
}

/// Operations the built-in processors need from the image-model service.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Model name reported in results.
    fn model(&self) -> &str;

    /// Generate a single image.
    async fn generate(&self, params: GenerateParams<'_>) -> Result<GeneratedImage, UpstreamError>;

    /// Describe the content of a set of images.
    async fn describe(&self, images: &[String]) -> Result<String, UpstreamError>;

    /// Fuse source images into one.
    async fn fuse(&self, params: FuseParams<'_>) -> Result<GeneratedImage, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct DescribeResponse {
    description: String,
}

/// [`UpstreamClient`] over HTTP with bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpUpstreamClient {
    /// Build a client from configuration.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Build a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, UpstreamError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, params: GenerateParams<'_>) -> Result<GeneratedImage, UpstreamError> {
        let response: ImagesResponse = self.post("/images/generations", &params).await?;
        response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::Malformed("generation returned no images".to_string()))
    }

    async fn describe(&self, images: &[String]) -> Result<String, UpstreamError> {
        let body = serde_json::json!({ "model": self.model, "images": images });
        let response: DescribeResponse = self.post("/images/describe", &body).await?;
        Ok(response.description)
    }

    async fn fuse(&self, params: FuseParams<'_>) -> Result<GeneratedImage, UpstreamError> {
        let response: ImagesResponse = self.post("/images/fusions", &params).await?;
        response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::Malformed("fusion returned no image".to_string()))
    }
}
