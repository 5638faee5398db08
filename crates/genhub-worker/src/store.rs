//! In-memory job store.
//!
//! The store is the only owner of job records. Every mutation goes through
//! [`JobStore::create`], [`JobStore::try_create`], or [`JobStore::update`],
//! and all of them take the same write lock as eviction, so the job table
//! and the owner index never disagree.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use genhub_core::error::AppError;
use genhub_core::types::{JobId, OwnerId};
use genhub_entity::job::{Job, JobPatch, JobStatus, TransitionError};

/// Internal state guarded by the store lock.
#[derive(Debug, Default)]
struct StoreState {
    /// Job records by id.
    jobs: HashMap<JobId, Job>,
    /// Owner identity to the ids of the jobs it created.
    owners: HashMap<OwnerId, HashSet<JobId>>,
}

impl StoreState {
    fn in_flight_for(&self, owner: &OwnerId) -> usize {
        self.owners.get(owner).map_or(0, |ids| {
            ids.iter()
                .filter_map(|id| self.jobs.get(id))
                .filter(|job| job.status.is_in_flight())
                .count()
        })
    }

    fn insert(&mut self, job: Job) {
        if let Some(owner) = &job.owner {
            self.owners.entry(owner.clone()).or_default().insert(job.id);
        }
        self.jobs.insert(job.id, job);
    }

    fn detach(&mut self, id: &JobId) -> Option<Job> {
        let job = self.jobs.remove(id)?;
        if let Some(owner) = &job.owner {
            if let Some(ids) = self.owners.get_mut(owner) {
                ids.remove(id);
                if ids.is_empty() {
                    self.owners.remove(owner);
                }
            }
        }
        Some(job)
    }

    fn evict_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let stale: Vec<JobId> = self
            .jobs
            .values()
            .filter(|job| job.status.is_terminal() && job.updated_at < cutoff)
            .map(|job| job.id)
            .collect();

        for id in &stale {
            self.detach(id);
        }
        stale.len()
    }
}

/// Aggregate counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    /// Jobs waiting for the runner.
    pub queued: usize,
    /// Jobs being processed.
    pub running: usize,
    /// Jobs that finished with a result.
    pub succeeded: usize,
    /// Jobs that finished with an error.
    pub failed: usize,
    /// All live jobs.
    pub total: usize,
    /// Distinct owners with at least one live job.
    pub owners: usize,
}

/// Process-wide in-memory job store.
///
/// Cheap to clone; clones share the same underlying state.
#[derive(Debug, Clone)]
pub struct JobStore {
    /// Protected job table and owner index.
    state: Arc<RwLock<StoreState>>,
    /// Retention window applied by opportunistic eviction on create.
    retention: Duration,
}

impl JobStore {
    /// Create an empty store that keeps finished jobs for `retention`.
    pub fn new(retention: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            retention,
        }
    }

    /// Retention window used for opportunistic eviction.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Create a `queued` job.
    ///
    /// Stale terminal jobs are evicted before the new record is inserted.
    pub async fn create(&self, job_type: &str, payload: Value, owner: Option<OwnerId>) -> Job {
        let mut state = self.state.write().await;
        let job = Job::new(job_type, payload, owner);
        Self::evict_locked(&mut state, self.retention, job.created_at);
        state.insert(job.clone());

        debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            owner = ?job.owner,
            "Job created"
        );
        job
    }

    /// Admission check and creation in one critical section.
    ///
    /// Anonymous callers are never limited. Fails with a rate-limit error
    /// when `owner` already holds `max_concurrent` queued or running jobs.
    pub async fn try_create(
        &self,
        job_type: &str,
        payload: Value,
        owner: Option<OwnerId>,
        max_concurrent: usize,
    ) -> Result<Job, AppError> {
        let mut state = self.state.write().await;

        if let Some(owner) = &owner {
            let in_flight = state.in_flight_for(owner);
            if in_flight >= max_concurrent {
                info!(
                    owner = %owner,
                    in_flight,
                    max_concurrent,
                    "Admission denied"
                );
                return Err(AppError::rate_limit(format!(
                    "Too many concurrent requests: {in_flight} jobs already in progress (limit {max_concurrent})"
                )));
            }
        }

        let job = Job::new(job_type, payload, owner);
        Self::evict_locked(&mut state, self.retention, job.created_at);
        state.insert(job.clone());

        debug!(job_id = %job.id, job_type = %job.job_type, "Job admitted");
        Ok(job)
    }

    /// Fetch a snapshot of a job.
    pub async fn get(&self, id: JobId) -> Option<Job> {
        self.state.read().await.jobs.get(&id).cloned()
    }

    /// Apply a partial update.
    ///
    /// Returns `Ok(None)` when the job no longer exists; a late progress
    /// report racing eviction or removal is expected and harmless. A patch
    /// that would break the lifecycle is rejected without mutation.
    pub async fn update(&self, id: JobId, patch: JobPatch) -> Result<Option<Job>, TransitionError> {
        let mut state = self.state.write().await;
        let Some(job) = state.jobs.get_mut(&id) else {
            debug!(job_id = %id, "Update for unknown job ignored");
            return Ok(None);
        };

        job.apply(patch, Utc::now())?;
        Ok(Some(job.clone()))
    }

    /// Whether `owner` holds fewer than `max_concurrent` queued or running jobs.
    ///
    /// Advisory only: a separate [`JobStore::create`] may race another
    /// caller. Use [`JobStore::try_create`] for a hard bound.
    pub async fn can_admit(&self, owner: &OwnerId, max_concurrent: usize) -> bool {
        self.state.read().await.in_flight_for(owner) < max_concurrent
    }

    /// Remove terminal jobs last updated more than `retention` ago.
    pub async fn evict_stale(&self, retention: Duration) -> usize {
        self.evict_stale_at(retention, Utc::now()).await
    }

    /// Eviction against an explicit clock reading.
    pub async fn evict_stale_at(&self, retention: Duration, now: DateTime<Utc>) -> usize {
        let mut state = self.state.write().await;
        let evicted = Self::evict_locked(&mut state, retention, now);
        if evicted > 0 {
            info!(evicted, remaining = state.jobs.len(), "Evicted stale jobs");
        }
        evicted
    }

    /// Unconditionally delete a job. Does not stop a running processor.
    pub async fn remove(&self, id: JobId) -> bool {
        let removed = self.state.write().await.detach(&id);
        if let Some(job) = &removed {
            info!(job_id = %id, status = %job.status, "Job removed");
        }
        removed.is_some()
    }

    /// Counts by status.
    pub async fn stats(&self) -> JobStats {
        let state = self.state.read().await;
        let mut stats = JobStats {
            total: state.jobs.len(),
            owners: state.owners.len(),
            ..Default::default()
        };
        for job in state.jobs.values() {
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Succeeded => stats.succeeded += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// All live jobs, oldest first.
    pub async fn list(&self) -> Vec<Job> {
        let state = self.state.read().await;
        let mut jobs: Vec<Job> = state.jobs.values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// Owner index snapshot.
    pub async fn owners(&self) -> BTreeMap<OwnerId, Vec<JobId>> {
        let state = self.state.read().await;
        state
            .owners
            .iter()
            .map(|(owner, ids)| (owner.clone(), ids.iter().copied().collect()))
            .collect()
    }

    fn evict_locked(state: &mut StoreState, retention: Duration, now: DateTime<Utc>) -> usize {
        let window = TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX);
        match now.checked_sub_signed(window) {
            Some(cutoff) => state.evict_before(cutoff),
            None => 0,
        }
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(15 * 60))
    }
}
