//! Processor contract and the registry that maps job types to processors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use genhub_core::error::{AppError, ErrorKind};
use genhub_core::types::{JobId, OwnerId};
use genhub_entity::job::{Job, JobPatch, TransitionError};

use crate::store::JobStore;

/// Error from processor execution.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The payload could not be decoded or failed validation.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// An upstream service failed after all retries.
    #[error("{0}")]
    Upstream(String),

    /// The processor exceeded its time budget.
    #[error("Processor timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// Any other processor failure.
    #[error("{0}")]
    Failed(String),
}

impl ProcessorError {
    /// Build a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<ProcessorError> for AppError {
    fn from(err: ProcessorError) -> Self {
        let kind = match &err {
            ProcessorError::InvalidPayload(_) => ErrorKind::Validation,
            ProcessorError::Upstream(_) => ErrorKind::ExternalService,
            ProcessorError::TimedOut(_) => ErrorKind::Timeout,
            ProcessorError::Failed(_) => ErrorKind::Internal,
        };
        AppError::new(kind, err.to_string())
    }
}

/// Execution context handed to a processor.
///
/// Carries the identity of the job being processed and, for queued jobs,
/// a handle for progress reports. Inline executions get a transient
/// context whose reports are dropped.
#[derive(Debug, Clone)]
pub struct JobContext {
    job_id: JobId,
    job_type: String,
    owner: Option<OwnerId>,
    store: Option<JobStore>,
}

impl JobContext {
    /// Context for a job tracked in `store`.
    pub fn tracked(job: &Job, store: JobStore) -> Self {
        Self {
            job_id: job.id,
            job_type: job.job_type.clone(),
            owner: job.owner.clone(),
            store: Some(store),
        }
    }

    /// Context for a transient job that is never stored.
    pub fn transient(job: &Job) -> Self {
        Self {
            job_id: job.id,
            job_type: job.job_type.clone(),
            owner: job.owner.clone(),
            store: None,
        }
    }

    /// Id of the job being processed.
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Type of the job being processed.
    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    /// Owner of the job, if any.
    pub fn owner(&self) -> Option<&OwnerId> {
        self.owner.as_ref()
    }

    /// Record progress (0-100) for the job.
    ///
    /// Silently ignored for transient jobs, for jobs that already finished,
    /// and for jobs that were removed or evicted while the processor was
    /// still running.
    pub async fn report_progress(&self, progress: u8) {
        let Some(store) = &self.store else {
            return;
        };
        match store.update(self.job_id, JobPatch::progress(progress)).await {
            Ok(Some(_)) => {
                tracing::trace!(job_id = %self.job_id, progress, "Progress reported");
            }
            Ok(None) => {
                tracing::debug!(job_id = %self.job_id, "Progress for a job that no longer exists");
            }
            Err(TransitionError::Terminal(status)) => {
                tracing::debug!(job_id = %self.job_id, %status, "Progress for a finished job ignored");
            }
            Err(e) => {
                tracing::warn!(job_id = %self.job_id, error = %e, "Progress report rejected");
            }
        }
    }
}

/// Typed processor for one job type.
///
/// Implementors never see JSON: the registry decodes the stored payload
/// into [`Processor::Payload`] and encodes [`Processor::Output`] back.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    /// Input decoded from the job payload.
    type Payload: DeserializeOwned + Send + 'static;
    /// Output stored as the job result.
    type Output: Serialize + Send;

    /// Reject payloads that decode but cannot be processed.
    fn validate(&self, _payload: &Self::Payload) -> Result<(), ProcessorError> {
        Ok(())
    }

    /// Execute the job.
    async fn process(
        &self,
        ctx: &JobContext,
        payload: Self::Payload,
    ) -> Result<Self::Output, ProcessorError>;
}

/// Object-safe processor operating on JSON values.
///
/// Every [`Processor`] is registered through this trait; it can also be
/// implemented directly for processors that want raw payloads.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    /// Check that `payload` is acceptable without running anything.
    fn check(&self, payload: &Value) -> Result<(), ProcessorError>;

    /// Execute the job.
    async fn process(&self, ctx: &JobContext, payload: Value) -> Result<Value, ProcessorError>;
}

/// Adapter erasing a typed processor's payload and output types.
struct Typed<P>(P);

impl<P: Processor> Typed<P> {
    fn decode(&self, payload: Value) -> Result<P::Payload, ProcessorError> {
        let decoded: P::Payload = serde_json::from_value(payload)
            .map_err(|e| ProcessorError::InvalidPayload(e.to_string()))?;
        self.0.validate(&decoded)?;
        Ok(decoded)
    }
}

#[async_trait]
impl<P: Processor> JobProcessor for Typed<P> {
    fn check(&self, payload: &Value) -> Result<(), ProcessorError> {
        self.decode(payload.clone()).map(|_| ())
    }

    async fn process(&self, ctx: &JobContext, payload: Value) -> Result<Value, ProcessorError> {
        let decoded = self.decode(payload)?;
        let output = self.0.process(ctx, decoded).await?;
        serde_json::to_value(output)
            .map_err(|e| ProcessorError::failed(format!("Failed to encode result: {e}")))
    }
}

/// Maps job types to processors.
///
/// Populated once at startup, then shared read-only behind an `Arc`.
#[derive(Default)]
pub struct ProcessorRegistry {
    /// Registered processors by job type.
    processors: HashMap<String, Arc<dyn JobProcessor>>,
}

impl ProcessorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed processor. Replaces any processor already bound to `job_type`.
    pub fn register<P: Processor>(&mut self, job_type: impl Into<String>, processor: P) {
        self.register_dyn(job_type, Arc::new(Typed(processor)));
    }

    /// Register an untyped processor. Replaces any processor already bound to `job_type`.
    pub fn register_dyn(&mut self, job_type: impl Into<String>, processor: Arc<dyn JobProcessor>) {
        let job_type = job_type.into();
        if self.processors.insert(job_type.clone(), processor).is_some() {
            tracing::warn!("Replaced processor for job type '{}'", job_type);
        } else {
            tracing::info!("Registered processor for job type '{}'", job_type);
        }
    }

    /// Look up the processor for `job_type`.
    pub fn get(&self, job_type: &str) -> Option<Arc<dyn JobProcessor>> {
        self.processors.get(job_type).cloned()
    }

    /// Registered job types, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.processors.keys().cloned().collect();
        types.sort();
        types
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("types", &self.registered_types())
            .finish()
    }
}
