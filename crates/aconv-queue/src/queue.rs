//! Bounded in-memory FIFO job queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use aconv_models::{Job, JobId};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::registry::JobRegistry;

/// Gauge tracking the number of pending jobs.
pub const QUEUE_DEPTH_GAUGE: &str = "aconv_queue_depth";

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Max pending jobs before enqueue is rejected
    pub capacity: usize,
    /// How long terminal jobs stay pollable
    pub retention: Duration,
    /// Interval between retention sweeps
    pub sweep_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            retention: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            capacity: std::env::var("QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&c| c > 0)
                .unwrap_or(100),
            retention: Duration::from_secs(
                std::env::var("JOB_RETENTION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            sweep_interval: Duration::from_secs(
                std::env::var("JOB_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|&s| s > 0)
                    .unwrap_or(60),
            ),
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<JobId>,
    closed: bool,
}

/// Bounded FIFO of job ids backed by a shared [`JobRegistry`].
#[derive(Debug)]
pub struct JobQueue {
    registry: Arc<JobRegistry>,
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
}

impl JobQueue {
    /// Create a new queue. A zero capacity is raised to one.
    pub fn new(registry: Arc<JobRegistry>, capacity: usize) -> Self {
        Self {
            registry,
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register the job and append it to the queue.
    ///
    /// Never waits for space: a full queue fails with
    /// [`QueueError::Backpressure`] and no registry entry is created.
    /// Returns the queue depth after the push.
    pub async fn enqueue(&self, job: Job) -> QueueResult<usize> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(QueueError::Closed);
        }
        if state.pending.len() >= self.capacity {
            warn!(
                job_id = %job.id,
                capacity = self.capacity,
                "Queue full, rejecting job"
            );
            return Err(QueueError::Backpressure {
                capacity: self.capacity,
            });
        }

        let job_id = job.id.clone();
        self.registry.create(job).await?;
        state.pending.push_back(job_id.clone());
        let depth = state.pending.len();
        drop(state);

        metrics::gauge!(QUEUE_DEPTH_GAUGE).set(depth as f64);
        debug!(job_id = %job_id, depth, "Enqueued job");
        self.notify.notify_one();
        Ok(depth)
    }

    /// Wait for the next job id in FIFO order.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub async fn dequeue(&self) -> Option<JobId> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(job_id) = state.pending.pop_front() {
                    let depth = state.pending.len();
                    if depth > 0 {
                        self.notify.notify_one();
                    }
                    drop(state);
                    metrics::gauge!(QUEUE_DEPTH_GAUGE).set(depth as f64);
                    return Some(job_id);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Stop accepting jobs and wake all waiting consumers.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if !state.closed {
            state.closed = true;
            info!(pending = state.pending.len(), "Job queue closed");
        }
        drop(state);
        self.notify.notify_waiters();
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aconv_models::{ConvertRequest, ExecutionMode, JobStatus};

    fn job(id: &str) -> Job {
        Job::new(
            JobId::from(id),
            ConvertRequest::new("https://example.com/a.mp4"),
            "/media-to-mp3",
            ExecutionMode::Queued,
        )
    }

    #[test]
    fn test_config_default() {
        let config = QueueConfig::default();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.retention, Duration::from_secs(3600));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = JobQueue::new(Arc::new(JobRegistry::new()), 10);
        for id in ["a", "b", "c"] {
            queue.enqueue(job(id)).await.unwrap();
        }

        assert_eq!(queue.dequeue().await, Some(JobId::from("a")));
        assert_eq!(queue.dequeue().await, Some(JobId::from("b")));
        assert_eq!(queue.dequeue().await, Some(JobId::from("c")));
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_backpressure_creates_no_registry_entry() {
        let registry = Arc::new(JobRegistry::new());
        let queue = JobQueue::new(registry.clone(), 2);

        assert_eq!(queue.enqueue(job("a")).await.unwrap(), 1);
        assert_eq!(queue.enqueue(job("b")).await.unwrap(), 2);

        let err = queue.enqueue(job("c")).await.unwrap_err();
        assert_eq!(err, QueueError::Backpressure { capacity: 2 });
        assert!(registry.get(&JobId::from("c")).await.is_none());
        assert_eq!(registry.len().await, 2);
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_is_not_queued() {
        let registry = Arc::new(JobRegistry::new());
        let queue = JobQueue::new(registry.clone(), 10);

        queue.enqueue(job("a")).await.unwrap();
        let err = queue.enqueue(job("a")).await.unwrap_err();
        assert!(matches!(err, QueueError::DuplicateJob(_)));
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_enqueue() {
        let queue = Arc::new(JobQueue::new(Arc::new(JobRegistry::new()), 10));

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::task::yield_now().await;
        queue.enqueue(job("late")).await.unwrap();

        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Some(JobId::from("late")));
    }

    #[tokio::test]
    async fn test_close_drains_then_returns_none() {
        let registry = Arc::new(JobRegistry::new());
        let queue = JobQueue::new(registry.clone(), 10);
        queue.enqueue(job("a")).await.unwrap();
        queue.close().await;

        assert_eq!(queue.enqueue(job("b")).await.unwrap_err(), QueueError::Closed);
        assert_eq!(queue.dequeue().await, Some(JobId::from("a")));
        assert_eq!(queue.dequeue().await, None);
        assert_eq!(
            registry.get(&JobId::from("a")).await.unwrap().status,
            JobStatus::Queued
        );
    }

    #[tokio::test]
    async fn test_close_wakes_waiting_consumers() {
        let queue = Arc::new(JobQueue::new(Arc::new(JobRegistry::new()), 10));
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.dequeue().await })
            })
            .collect();
        tokio::task::yield_now().await;
        queue.close().await;

        for consumer in consumers {
            let got = tokio::time::timeout(Duration::from_secs(1), consumer)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got, None);
        }
    }
}
