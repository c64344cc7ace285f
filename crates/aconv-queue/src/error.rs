//! Queue error types.

use aconv_models::{InvalidTransition, JobStatus};
use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Queue is full (capacity {capacity})")]
    Backpressure { capacity: usize },

    #[error("Job already in flight: {0}")]
    DuplicateJob(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Queue is closed")]
    Closed,
}

impl QueueError {
    pub fn duplicate(id: impl Into<String>) -> Self {
        Self::DuplicateJob(id.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::JobNotFound(id.into())
    }
}

impl From<InvalidTransition> for QueueError {
    fn from(e: InvalidTransition) -> Self {
        Self::InvalidTransition {
            from: e.from,
            to: e.to,
        }
    }
}
