//! Execution-mode dispatch.
//!
//! The only place that branches on [`ExecutionMode`]: in sync mode the
//! processor runs inline against a transient job, in async mode the job is
//! admitted into the store and handed to the runner.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use genhub_core::config::ExecutionMode;
use genhub_core::error::AppError;
use genhub_core::types::{JobId, OwnerId};
use genhub_entity::job::{Job, JobView};

use crate::executor::{JobContext, ProcessorError, ProcessorRegistry};
use crate::runner::JobRunner;
use crate::store::JobStore;

/// Outcome of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The processor ran inline and produced this result.
    Sync {
        /// Processor output.
        result: Value,
    },
    /// The job was queued; poll with this id.
    Async {
        /// Id of the queued job.
        job_id: JobId,
    },
}

/// Routes submissions to inline execution or the background runner.
#[derive(Debug, Clone)]
pub struct JobDispatcher {
    mode: ExecutionMode,
    store: JobStore,
    runner: JobRunner,
    registry: Arc<ProcessorRegistry>,
    max_concurrent: usize,
    timeout: Option<Duration>,
}

impl JobDispatcher {
    /// Create a dispatcher. The per-owner ceiling defaults to 3.
    pub fn new(
        mode: ExecutionMode,
        store: JobStore,
        runner: JobRunner,
        registry: Arc<ProcessorRegistry>,
    ) -> Self {
        Self {
            mode,
            store,
            runner,
            registry,
            max_concurrent: 3,
            timeout: None,
        }
    }

    /// Set the per-owner ceiling on queued and running jobs.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Bound inline executions in sync mode.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolved execution mode.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Per-owner ceiling.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Submit a job.
    ///
    /// Unknown job types and payloads the processor rejects fail with a
    /// validation error before anything is stored or run. In async mode a
    /// caller at the ceiling gets a rate-limit error.
    pub async fn submit(
        &self,
        job_type: &str,
        payload: Value,
        owner: Option<OwnerId>,
    ) -> Result<Submission, AppError> {
        let Some(processor) = self.registry.get(job_type) else {
            return Err(AppError::validation(format!(
                "Unknown job type '{job_type}'"
            )));
        };
        processor.check(&payload).map_err(AppError::from)?;

        match self.mode {
            ExecutionMode::Sync => {
                let job = Job::new(job_type, payload, owner);
                let ctx = JobContext::transient(&job);
                tracing::info!(job_id = %job.id, job_type, "Running job inline");

                let payload = job.payload.clone();
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
                let result = joined.unwrap_or_else(|e| {
                    Err(ProcessorError::failed(if e.is_panic() {
                        "Processor panicked".to_string()
                    } else {
                        format!("Processor task aborted: {e}")
                    }))
                });

                match result {
                    Ok(result) => Ok(Submission::Sync { result }),
                    Err(e) => {
                        tracing::warn!(job_id = %job.id, job_type, error = %e, "Inline job failed");
                        Err(e.into())
                    }
                }
            }
            ExecutionMode::Async => {
                let job = self
                    .store
                    .try_create(job_type, payload, owner, self.max_concurrent)
                    .await?;
                self.runner.spawn(job.id);
                tracing::info!(job_id = %job.id, job_type, "Job queued");
                Ok(Submission::Async { job_id: job.id })
            }
        }
    }

    /// Poll a job on behalf of `caller`.
    ///
    /// A job owned by someone else is reported as not found.
    pub async fn poll(&self, id: JobId, caller: Option<&OwnerId>) -> Result<JobView, AppError> {
        match self.store.get(id).await {
            Some(job) if job.is_visible_to(caller) => Ok(job.view()),
            Some(_) => {
                tracing::debug!(job_id = %id, caller = ?caller, "Poll by non-owner");
                Err(AppError::not_found(format!("Job {id} not found")))
            }
            None => Err(AppError::not_found(format!("Job {id} not found"))),
        }
    }

    /// Whether `owner` may submit another job right now. Advisory.
    pub async fn can_admit(&self, owner: Option<&OwnerId>) -> bool {
        match owner {
            Some(owner) => self.store.can_admit(owner, self.max_concurrent).await,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use genhub_core::error::ErrorKind;
    use genhub_entity::job::JobStatus;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use tokio::sync::Notify;

    use crate::executor::Processor;

    #[derive(Debug, Serialize, Deserialize)]
    struct Number {
        n: i64,
    }

    struct Echo;

    #[async_trait]
    impl Processor for Echo {
        type Payload = Number;
        type Output = Number;

        async fn process(&self, _ctx: &JobContext, payload: Number) -> Result<Number, ProcessorError> {
            Ok(Number { n: payload.n * 2 })
        }
    }

    struct Boom;

    #[async_trait]
    impl Processor for Boom {
        type Payload = Value;
        type Output = Value;

        async fn process(&self, _ctx: &JobContext, _payload: Value) -> Result<Value, ProcessorError> {
            Err(ProcessorError::Upstream("upstream unavailable".to_string()))
        }
    }

    struct Held(Arc<Notify>);

    #[async_trait]
    impl Processor for Held {
        type Payload = Value;
        type Output = Value;

        async fn process(&self, _ctx: &JobContext, _payload: Value) -> Result<Value, ProcessorError> {
            self.0.notified().await;
            Ok(Value::Null)
        }
    }

    struct Panics;

    #[async_trait]
    impl Processor for Panics {
        type Payload = Value;
        type Output = Value;

        async fn process(&self, _ctx: &JobContext, _payload: Value) -> Result<Value, ProcessorError> {
            panic!("processor bug");
        }
    }

    fn dispatcher(mode: ExecutionMode, release: Arc<Notify>) -> (JobStore, JobDispatcher) {
        let mut registry = ProcessorRegistry::new();
        registry.register("echo", Echo);
        registry.register("boom", Boom);
        registry.register("held", Held(release));
        registry.register("panics", Panics);
        let registry = Arc::new(registry);

        let store = JobStore::default();
        let runner = JobRunner::new(store.clone(), Arc::clone(&registry));
        let dispatcher =
            JobDispatcher::new(mode, store.clone(), runner, registry).with_max_concurrent(2);
        (store, dispatcher)
    }

    async fn wait_for_terminal(dispatcher: &JobDispatcher, id: JobId) -> JobView {
        for _ in 0..200 {
            let view = dispatcher.poll(id, None).await.expect("poll");
            if view.status.is_terminal() {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {id} never finished");
    }

    #[tokio::test]
    async fn test_async_submit_returns_id_and_finishes() {
        let (_store, dispatcher) = dispatcher(ExecutionMode::Async, Arc::new(Notify::new()));

        let submission = dispatcher
            .submit("echo", json!({"n": 5}), None)
            .await
            .expect("submit");
        let Submission::Async { job_id } = submission else {
            panic!("expected async submission");
        };

        let view = wait_for_terminal(&dispatcher, job_id).await;
        assert_eq!(view.status, JobStatus::Succeeded);
        assert_eq!(view.result, Some(json!({"n": 10})));
    }

    #[tokio::test]
    async fn test_async_failure_is_visible_on_poll() {
        let (_store, dispatcher) = dispatcher(ExecutionMode::Async, Arc::new(Notify::new()));

        let Submission::Async { job_id } = dispatcher
            .submit("boom", json!({}), None)
            .await
            .expect("submit")
        else {
            panic!("expected async submission");
        };

        let view = wait_for_terminal(&dispatcher, job_id).await;
        assert_eq!(view.status, JobStatus::Failed);
        assert_eq!(view.error.as_deref(), Some("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_owner_ceiling_rejects_third_job() {
        let release = Arc::new(Notify::new());
        let (store, dispatcher) = dispatcher(ExecutionMode::Async, Arc::clone(&release));
        let owner = OwnerId::new("ownerB");

        for _ in 0..2 {
            dispatcher
                .submit("held", json!({}), Some(owner.clone()))
                .await
                .expect("admitted");
        }
        assert!(!dispatcher.can_admit(Some(&owner)).await);

        let err = dispatcher
            .submit("held", json!({}), Some(owner.clone()))
            .await
            .expect_err("third job rejected");
        assert_eq!(err.kind, ErrorKind::RateLimit);
        assert_eq!(store.stats().await.total, 2);

        // Other owners and anonymous callers are unaffected.
        assert!(dispatcher.can_admit(Some(&OwnerId::new("ownerC"))).await);
        assert!(dispatcher.can_admit(None).await);

        release.notify_waiters();
    }

    #[tokio::test]
    async fn test_poll_hides_jobs_from_other_owners() {
        let (_store, dispatcher) = dispatcher(ExecutionMode::Async, Arc::new(Notify::new()));
        let owner = OwnerId::new("ownerA");

        let Submission::Async { job_id } = dispatcher
            .submit("echo", json!({"n": 1}), Some(owner.clone()))
            .await
            .expect("submit")
        else {
            panic!("expected async submission");
        };

        assert!(dispatcher.poll(job_id, Some(&owner)).await.is_ok());
        let err = dispatcher
            .poll(job_id, Some(&OwnerId::new("ownerB")))
            .await
            .expect_err("hidden");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(
            dispatcher.poll(job_id, None).await.expect_err("hidden").kind,
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_sync_mode_returns_result_without_storing() {
        let (store, dispatcher) = dispatcher(ExecutionMode::Sync, Arc::new(Notify::new()));

        let submission = dispatcher
            .submit("echo", json!({"n": 5}), Some(OwnerId::new("ownerA")))
            .await
            .expect("submit");
        assert_eq!(
            submission,
            Submission::Sync {
                result: json!({"n": 10})
            }
        );
        assert_eq!(store.stats().await.total, 0);
    }

    #[tokio::test]
    async fn test_sync_mode_surfaces_processor_error() {
        let (store, dispatcher) = dispatcher(ExecutionMode::Sync, Arc::new(Notify::new()));

        let err = dispatcher
            .submit("boom", json!({}), None)
            .await
            .expect_err("boom");
        assert_eq!(err.kind, ErrorKind::ExternalService);
        assert_eq!(err.message, "upstream unavailable");
        assert_eq!(store.stats().await.total, 0);
    }

    #[tokio::test]
    async fn test_unknown_type_and_bad_payload_are_rejected_up_front() {
        let (store, dispatcher) = dispatcher(ExecutionMode::Async, Arc::new(Notify::new()));

        let err = dispatcher
            .submit("video_generation", json!({}), None)
            .await
            .expect_err("unknown type");
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = dispatcher
            .submit("echo", json!({"n": "five"}), None)
            .await
            .expect_err("bad payload");
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(store.stats().await.total, 0);
    }

    #[tokio::test]
    async fn test_sync_mode_turns_panic_into_internal_error() {
        let (store, dispatcher) = dispatcher(ExecutionMode::Sync, Arc::new(Notify::new()));

        let err = dispatcher
            .submit("panics", json!({}), None)
            .await
            .expect_err("panic surfaces as an error");
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, "Processor panicked");
        assert_eq!(store.stats().await.total, 0);

        // The dispatcher keeps working afterwards.
        let submission = dispatcher
            .submit("echo", json!({"n": 2}), None)
            .await
            .expect("submit");
        assert_eq!(submission, Submission::Sync { result: json!({"n": 4}) });
    }
}
