//! Response DTOs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use genhub_core::config::ExecutionMode;
use genhub_core::types::{JobId, OwnerId};
use genhub_entity::job::Job;
use genhub_worker::{JobStats, Submission};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Outcome of a job submission, tagged by execution mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SubmissionResponse {
    /// Processed inline.
    Sync {
        /// Processor output.
        result: Value,
    },
    /// Queued for background processing.
    Async {
        /// Id to poll.
        job_id: JobId,
    },
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        match submission {
            Submission::Sync { result } => Self::Sync { result },
            Submission::Async { job_id } => Self::Async { job_id },
        }
    }
}

/// Admin view of the store's contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListingResponse {
    /// Live jobs, oldest first.
    pub jobs: Vec<Job>,
    /// Owner identity to the ids of its jobs.
    pub owners: BTreeMap<OwnerId, Vec<JobId>>,
    /// Counts by status.
    pub stats: JobStats,
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server answers.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Resolved execution mode.
    pub mode: ExecutionMode,
    /// Registered job types.
    pub job_types: Vec<String>,
    /// When the process started.
    pub started_at: DateTime<Utc>,
    /// Seconds since start.
    pub uptime_seconds: i64,
}
