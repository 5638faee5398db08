//! Upstream AI service configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the third-party image service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the image API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every request. Empty disables the header.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier passed through to the service.
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Attempts per upstream call before giving up.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Fixed delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            request_timeout_seconds: default_request_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:9000/v1".to_string()
}

fn default_model() -> String {
    "image-default".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2000
}
