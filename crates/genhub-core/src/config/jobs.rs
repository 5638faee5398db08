//! Job orchestration configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the job store, runner, and eviction ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Maximum number of queued or running jobs a single owner may hold.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_per_owner: usize,
    /// How long a finished job stays pollable, in seconds.
    #[serde(default = "default_retention")]
    pub retention_seconds: u64,
    /// Cron expression (with seconds) for the stale-job eviction sweep.
    #[serde(default = "default_eviction_cron")]
    pub eviction_cron: String,
    /// Upper bound for a single processor invocation, in seconds. `0` disables it.
    #[serde(default = "default_processor_timeout")]
    pub processor_timeout_seconds: u64,
}

impl JobsConfig {
    /// Retention window as a [`Duration`].
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_seconds)
    }

    /// Processor timeout, or `None` when disabled.
    pub fn processor_timeout(&self) -> Option<Duration> {
        (self.processor_timeout_seconds > 0)
            .then(|| Duration::from_secs(self.processor_timeout_seconds))
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_per_owner: default_max_concurrent(),
            retention_seconds: default_retention(),
            eviction_cron: default_eviction_cron(),
            processor_timeout_seconds: default_processor_timeout(),
        }
    }
}

fn default_max_concurrent() -> usize {
    3
}

fn default_retention() -> u64 {
    15 * 60
}

fn default_eviction_cron() -> String {
    "0 */2 * * * *".to_string()
}

fn default_processor_timeout() -> u64 {
    300
}
