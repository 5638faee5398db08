//! Execution-mode selection.
//!
//! Stateless hosts (serverless functions) cannot outlive the request that
//! invoked them, so jobs there must run inline. Long-lived processes queue
//! jobs and let callers poll.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Configured execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    /// Detect from the environment at startup.
    #[default]
    Auto,
    /// Always run processors inline.
    Sync,
    /// Always queue jobs for background execution.
    Async,
}

/// Resolved execution mode for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Inline execution; the result is returned on the originating request.
    Sync,
    /// Queued execution; the caller receives a job id and polls.
    Async,
}

impl ExecutionMode {
    /// Return the mode as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution-mode configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// `"auto"`, `"sync"`, or `"async"`.
    #[serde(default)]
    pub mode: ModeSetting,
    /// Environment variables whose presence marks a stateless host.
    #[serde(default = "default_serverless_markers")]
    pub serverless_markers: Vec<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ModeSetting::Auto,
            serverless_markers: default_serverless_markers(),
        }
    }
}

impl ExecutionConfig {
    /// Resolve the mode against the process environment.
    pub fn resolve(&self) -> ExecutionMode {
        self.resolve_with(|name| std::env::var_os(name).is_some_and(|v| !v.is_empty()))
    }

    /// Resolve the mode using `is_set` to probe marker variables.
    pub fn resolve_with(&self, is_set: impl Fn(&str) -> bool) -> ExecutionMode {
        match self.mode {
            ModeSetting::Sync => ExecutionMode::Sync,
            ModeSetting::Async => ExecutionMode::Async,
            ModeSetting::Auto => {
                if let Some(marker) = self.serverless_markers.iter().find(|m| is_set(m)) {
                    tracing::info!(marker = %marker, "Stateless host detected, running jobs inline");
                    ExecutionMode::Sync
                } else {
                    ExecutionMode::Async
                }
            }
        }
    }
}

fn default_serverless_markers() -> Vec<String> {
    vec![
        "VERCEL".to_string(),
        "AWS_LAMBDA_FUNCTION_NAME".to_string(),
        "NETLIFY".to_string(),
    ]
}
