//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use genhub_core::types::{JobId, OwnerId};

use super::status::JobStatus;

/// An orchestrated job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Processor key (e.g., `"image_generation"`).
    #[serde(rename = "type")]
    pub job_type: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Caller that created the job, if known.
    pub owner: Option<OwnerId>,
    /// Type-specific input, immutable after creation.
    pub payload: Value,
    /// Completion percentage, 0-100.
    pub progress: u8,
    /// Result data, present only once succeeded.
    pub result: Option<Value>,
    /// Failure description, present only once failed.
    pub error: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a fresh `queued` job.
    pub fn new(job_type: impl Into<String>, payload: Value, owner: Option<OwnerId>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            status: JobStatus::Queued,
            owner,
            payload,
            progress: 0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `caller` may observe this job.
    ///
    /// Jobs without a recorded owner are visible to everyone.
    pub fn is_visible_to(&self, caller: Option<&OwnerId>) -> bool {
        match &self.owner {
            None => true,
            Some(owner) => caller == Some(owner),
        }
    }

    /// Apply a partial update, refreshing `updated_at`.
    ///
    /// The patch is validated as a whole before anything is written, so a
    /// rejected patch leaves the job untouched. Finished jobs accept no
    /// patches at all.
    pub fn apply(&mut self, patch: JobPatch, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal(self.status));
        }

        let next_status = match patch.status {
            Some(next) if next != self.status => {
                if !self.status.can_transition_to(next) {
                    return Err(TransitionError::IllegalTransition {
                        from: self.status,
                        to: next,
                    });
                }
                next
            }
            _ => self.status,
        };

        if patch.result.is_some() && next_status != JobStatus::Succeeded {
            return Err(TransitionError::ResultWithoutSuccess(next_status));
        }
        if patch.error.is_some() && next_status != JobStatus::Failed {
            return Err(TransitionError::ErrorWithoutFailure(next_status));
        }

        self.status = next_status;
        if let Some(progress) = patch.progress {
            if next_status == JobStatus::Running || patch.status.is_some() {
                self.progress = progress.min(100);
            }
        }
        if let Some(result) = patch.result {
            self.result = Some(result);
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Project the fields exposed to pollers.
    pub fn view(&self) -> JobView {
        JobView {
            id: self.id,
            job_type: self.job_type.clone(),
            status: self.status,
            progress: self.progress,
            result: self.result.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Partial update applied through the job store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    /// New status.
    pub status: Option<JobStatus>,
    /// New progress.
    pub progress: Option<u8>,
    /// Result payload.
    pub result: Option<Value>,
    /// Failure description.
    pub error: Option<String>,
}

impl JobPatch {
    /// Transition to `running` with progress reset.
    pub fn started() -> Self {
        Self {
            status: Some(JobStatus::Running),
            progress: Some(0),
            ..Default::default()
        }
    }

    /// Progress report from a running processor.
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    /// Terminal success with the processor's result.
    pub fn succeeded(result: Value) -> Self {
        Self {
            status: Some(JobStatus::Succeeded),
            progress: Some(100),
            result: Some(result),
            ..Default::default()
        }
    }

    /// Terminal failure with a description.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Rejected job update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The job already finished; nothing about it may change.
    #[error("job is already {0}")]
    Terminal(JobStatus),
    /// The requested status change would skip or reverse a lifecycle step.
    #[error("cannot move job from {from} to {to}")]
    IllegalTransition {
        /// Current status.
        from: JobStatus,
        /// Requested status.
        to: JobStatus,
    },
    /// A result was supplied for a job that is not succeeding.
    #[error("result supplied for a job in status {0}")]
    ResultWithoutSuccess(JobStatus),
    /// An error was supplied for a job that is not failing.
    #[error("error supplied for a job in status {0}")]
    ErrorWithoutFailure(JobStatus),
}

/// Poll-facing view of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    /// Job identifier.
    pub id: JobId,
    /// Processor key.
    #[serde(rename = "type")]
    pub job_type: String,
    /// Current status.
    pub status: JobStatus,
    /// Completion percentage.
    pub progress: u8,
    /// Result, once succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error, once failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}
