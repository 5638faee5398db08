//! Cron scheduler for periodic store maintenance.

use std::time::Duration;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use genhub_core::error::AppError;
use genhub_core::result::AppResult;

use crate::store::JobStore;

/// Cron-based scheduler that evicts stale jobs from the store.
pub struct EvictionScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Store swept by the eviction task
    store: JobStore,
}

impl std::fmt::Debug for EvictionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionScheduler").finish()
    }
}

impl EvictionScheduler {
    /// Create a new scheduler for `store`
    pub async fn new(store: JobStore) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self { scheduler, store })
    }

    /// Register the eviction sweep on `cron` (six fields, seconds first)
    pub async fn register_eviction(&self, cron: &str, retention: Duration) -> AppResult<()> {
        let store = self.store.clone();
        let job = CronJob::new_async(cron, move |_uuid, _lock| {
            let store = store.clone();
            Box::pin(async move {
                let evicted = store.evict_stale(retention).await;
                tracing::debug!(evicted, "Eviction sweep finished");
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid eviction schedule '{}': {}", cron, e))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add eviction schedule: {}", e)))?;

        tracing::info!(
            "Registered: job eviction ({}, retention {}s)",
            cron,
            retention.as_secs()
        );
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Eviction scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> AppResult<()> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Eviction scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genhub_core::error::ErrorKind;

    #[tokio::test]
    async fn test_invalid_cron_is_a_configuration_error() {
        let scheduler = EvictionScheduler::new(JobStore::default())
            .await
            .expect("scheduler");
        let err = scheduler
            .register_eviction("every two minutes", Duration::from_secs(900))
            .await
            .expect_err("must reject");
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_default_schedule_registers() {
        let scheduler = EvictionScheduler::new(JobStore::default())
            .await
            .expect("scheduler");
        scheduler
            .register_eviction("0 */2 * * * *", Duration::from_secs(900))
            .await
            .expect("registered");
    }
}
