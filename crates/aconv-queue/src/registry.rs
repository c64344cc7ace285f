//! Authoritative in-memory job store.

use std::collections::HashMap;
use std::time::Duration;

use aconv_models::{DeliveryStatus, Job, JobId, JobOutcome, JobStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{QueueError, QueueResult};

/// Number of tracked jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl JobCounts {
    pub fn total(&self) -> usize {
        self.queued + self.running + self.succeeded + self.failed
    }
}

/// Job id -> job record.
///
/// Every operation takes the lock exactly once, so operations on a single job
/// are linearizable.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job.
    ///
    /// Fails if a non-terminal job with the same id exists. A retained terminal
    /// job with the same id is replaced.
    pub async fn create(&self, job: Job) -> QueueResult<()> {
        let mut jobs = self.jobs.write().await;
        if let Some(existing) = jobs.get(&job.id) {
            if !existing.is_terminal() {
                return Err(QueueError::duplicate(job.id.as_str()));
            }
            debug!(job_id = %job.id, "Replacing retained terminal job");
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    /// Snapshot of a job.
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Move `queued -> running`. Only one caller can win for a given id.
    pub async fn claim(&self, id: &JobId) -> QueueResult<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| QueueError::not_found(id.as_str()))?;
        job.start()?;
        Ok(job.clone())
    }

    /// Move `running -> succeeded | failed` and store the outcome.
    pub async fn complete(&self, id: &JobId, outcome: JobOutcome) -> QueueResult<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| QueueError::not_found(id.as_str()))?;
        job.finish(outcome)?;
        Ok(job.clone())
    }

    /// Update webhook delivery bookkeeping. Never touches the job status.
    pub async fn record_delivery(&self, id: &JobId, delivery: DeliveryStatus) -> QueueResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| QueueError::not_found(id.as_str()))?;
        job.delivery = delivery;
        Ok(())
    }

    /// Remove terminal jobs completed more than `ttl` ago.
    pub async fn evict_expired(&self, ttl: Duration) -> usize {
        self.evict_expired_at(Utc::now(), ttl).await
    }

    /// [`Self::evict_expired`] against an explicit clock.
    pub async fn evict_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            let Some(completed_at) = job.completed_at else {
                return true;
            };
            if !job.is_terminal() {
                return true;
            }
            match (now - completed_at).to_std() {
                Ok(age) => age < ttl,
                Err(_) => true,
            }
        });
        let evicted = before - jobs.len();
        if evicted > 0 {
            info!(evicted, remaining = jobs.len(), "Evicted expired jobs");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    pub async fn counts(&self) -> JobCounts {
        let jobs = self.jobs.read().await;
        let mut counts = JobCounts::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Succeeded => counts.succeeded += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}
