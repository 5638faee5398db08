//! Job runner: drives one queued job through its processor.
//!
//! The runner is the only writer of lifecycle transitions for queued jobs.
//! A job id is run at most once at a time; the in-flight set is released by
//! an RAII guard on every exit path.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use serde_json::Value;
use tokio::task::JoinHandle;

use genhub_core::types::JobId;
use genhub_entity::job::{JobPatch, JobStatus};

use crate::executor::{JobContext, ProcessorError, ProcessorRegistry};
use crate::store::JobStore;

/// Message recorded when a processor fails without saying why.
const GENERIC_FAILURE: &str = "Job processing failed";

/// Why a run did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another run of the same job is in progress.
    AlreadyRunning,
    /// The job does not exist.
    Missing,
    /// The job has already left `queued`.
    NotQueued(JobStatus),
}

/// How a call to [`JobRunner::run`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Nothing was executed.
    Skipped(SkipReason),
    /// The processor returned a result.
    Succeeded,
    /// The job was marked failed with this message.
    Failed(String),
}

/// Removes the job id from the in-flight set when dropped.
struct InFlightGuard {
    in_flight: Arc<DashSet<JobId>>,
    id: JobId,
}

impl InFlightGuard {
    fn acquire(in_flight: &Arc<DashSet<JobId>>, id: JobId) -> Option<Self> {
        if !in_flight.insert(id) {
            return None;
        }
        Some(Self {
            in_flight: Arc::clone(in_flight),
            id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}

/// Executes queued jobs against the processor registry.
#[derive(Debug, Clone)]
pub struct JobRunner {
    /// Job store holding the records being driven.
    store: JobStore,
    /// Processors by job type.
    registry: Arc<ProcessorRegistry>,
    /// Job ids currently being run.
    in_flight: Arc<DashSet<JobId>>,
    /// Upper bound on a single processor invocation.
    timeout: Option<Duration>,
}

impl JobRunner {
    /// Create a runner with no processor timeout.
    pub fn new(store: JobStore, registry: Arc<ProcessorRegistry>) -> Self {
        Self {
            store,
            registry,
            in_flight: Arc::new(DashSet::new()),
            timeout: None,
        }
    }

    /// Bound each processor invocation. `None` disables the bound.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `id` is currently being run.
    pub fn is_in_flight(&self, id: JobId) -> bool {
        self.in_flight.contains(&id)
    }

    /// Number of runs in progress.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Run the job in a detached task.
    pub fn spawn(&self, id: JobId) -> JoinHandle<RunOutcome> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run(id).await })
    }

    /// Drive a queued job to a terminal status.
    ///
    /// Never fails: every processor error is recorded on the job.
    pub async fn run(&self, id: JobId) -> RunOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, id) else {
            tracing::debug!(job_id = %id, "Job already in flight, skipping");
            return RunOutcome::Skipped(SkipReason::AlreadyRunning);
        };

        let Some(job) = self.store.get(id).await else {
            tracing::debug!(job_id = %id, "Job not found, skipping");
            return RunOutcome::Skipped(SkipReason::Missing);
        };
        if job.status != JobStatus::Queued {
            tracing::debug!(job_id = %id, status = %job.status, "Job not queued, skipping");
            return RunOutcome::Skipped(SkipReason::NotQueued(job.status));
        }

        match self.store.update(id, JobPatch::started()).await {
            Ok(Some(_)) => {}
            Ok(None) => return RunOutcome::Skipped(SkipReason::Missing),
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Could not start job");
                return RunOutcome::Skipped(SkipReason::NotQueued(job.status));
            }
        }

        tracing::info!(job_id = %id, job_type = %job.job_type, owner = ?job.owner, "Job started");

        let Some(processor) = self.registry.get(&job.job_type) else {
            let message = format!("No processor registered for job type '{}'", job.job_type);
            tracing::error!(job_id = %id, job_type = %job.job_type, "{}", message);
            return self.finish(id, Err(message)).await;
        };

        let ctx = JobContext::tracked(&job, self.store.clone());
        let payload = job.payload;
        let mut task = tokio::spawn(async move { processor.process(&ctx, payload).await });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    Ok(Err(ProcessorError::TimedOut(limit)))
                }
            },
            None => task.await,
        };

        let result = match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) if e.is_panic() => Err("Processor panicked".to_string()),
            Err(e) => Err(format!("Processor task aborted: {e}")),
        };

        self.finish(id, result).await
    }

    async fn finish(&self, id: JobId, result: Result<Value, String>) -> RunOutcome {
        let (patch, outcome) = match result {
            Ok(value) => (JobPatch::succeeded(value), RunOutcome::Succeeded),
            Err(message) => {
                let message = if message.trim().is_empty() {
                    GENERIC_FAILURE.to_string()
                } else {
                    message
                };
                (
                    JobPatch::failed(message.clone()),
                    RunOutcome::Failed(message),
                )
            }
        };

        match self.store.update(id, patch).await {
            Ok(Some(job)) => {
                tracing::info!(job_id = %id, status = %job.status, "Job finished");
            }
            Ok(None) => {
                tracing::info!(job_id = %id, "Job removed before it finished, result dropped");
            }
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Failed to record job outcome");
            }
        }
        outcome
    }
}
