//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use genhub_core::config::{AppConfig, ExecutionMode};
use genhub_worker::{JobDispatcher, JobRunner, JobStore, ProcessorRegistry};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// Every field is cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// In-memory job store
    pub store: JobStore,
    /// Processors by job type
    pub registry: Arc<ProcessorRegistry>,
    /// Background runner for queued jobs
    pub runner: JobRunner,
    /// Sync/async submission strategy
    pub dispatcher: JobDispatcher,
    /// Process start time, for health reporting
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire the store, runner, and dispatcher for `mode`.
    pub fn new(config: AppConfig, mode: ExecutionMode, registry: ProcessorRegistry) -> Self {
        let registry = Arc::new(registry);
        let store = JobStore::new(config.jobs.retention());
        let timeout = config.jobs.processor_timeout();

        let runner =
            JobRunner::new(store.clone(), Arc::clone(&registry)).with_timeout(timeout);
        let dispatcher = JobDispatcher::new(mode, store.clone(), runner.clone(), Arc::clone(&registry))
            .with_max_concurrent(config.jobs.max_concurrent_per_owner)
            .with_timeout(timeout);

        Self {
            config: Arc::new(config),
            store,
            registry,
            runner,
            dispatcher,
            started_at: Utc::now(),
        }
    }

    /// Resolved execution mode.
    pub fn mode(&self) -> ExecutionMode {
        self.dispatcher.mode()
    }
}
