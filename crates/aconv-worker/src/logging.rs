//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for job execution with
//! tracing spans and contextual information.

use aconv_models::{ExecutionMode, JobId};
use tracing::{error, info, Span};

/// Job logger for structured logging with consistent formatting.
///
/// Every event carries the job ID and the operation (route) so queued and
/// bypass runs of the same route can be correlated.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
    mode: ExecutionMode,
}

impl JobLogger {
    /// Create a new job logger for a specific job and operation.
    pub fn new(job_id: &JobId, operation: &str, mode: ExecutionMode) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
            mode,
        }
    }

    /// Log the start of a job operation.
    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            mode = ?self.mode,
            "Job started: {}", message
        );
    }

    /// Log an error during job execution.
    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            mode = ?self.mode,
            "Job error: {}", message
        );
    }

    /// Log the completion of a job operation.
    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            mode = ?self.mode,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}
