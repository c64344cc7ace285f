//! Job record and lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::{ConvertRequest, DeliveryStatus, JobOutcome};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job lifecycle status.
///
/// Transitions are only `Queued -> Running -> {Succeeded | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue
    #[default]
    Queued,
    /// Claimed by an executor
    Running,
    /// Handler returned a result
    Succeeded,
    /// Handler failed; error text captured on the outcome
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// How the job reached the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Pulled from the queue by a pool executor
    #[default]
    Queued,
    /// Ran inline on the admitting request
    Bypass,
}

/// A tracked unit of conversion work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Validated request payload
    pub request: ConvertRequest,

    /// Originating route name
    pub route: String,

    /// Queue or bypass execution
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Claimed-by-executor timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Terminal transition timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Terminal outcome, set exactly once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JobOutcome>,

    /// Webhook delivery bookkeeping
    #[serde(default)]
    pub delivery: DeliveryStatus,
}

impl Job {
    /// Create a new queued job.
    pub fn new(
        id: JobId,
        request: ConvertRequest,
        route: impl Into<String>,
        mode: ExecutionMode,
    ) -> Self {
        let delivery = if request.webhook_url.is_some() {
            DeliveryStatus::Pending
        } else {
            DeliveryStatus::NotRequested
        };

        Self {
            id,
            request,
            route: route.into(),
            mode,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            outcome: None,
            delivery,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move `Queued -> Running`.
    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::Running)?;
        // Wall clock may step backwards; keep timestamps ordered.
        self.started_at = Some(Utc::now().max(self.created_at));
        Ok(())
    }

    /// Move `Running -> Succeeded | Failed` and store the outcome.
    pub fn finish(&mut self, outcome: JobOutcome) -> Result<(), InvalidTransition> {
        let next = outcome.status;
        if !next.is_terminal() {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.transition(next)?;
        let started = self.started_at.unwrap_or(self.created_at);
        self.completed_at = Some(Utc::now().max(started));
        self.outcome = Some(outcome);
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Seconds spent waiting before an executor claimed the job.
    pub fn queue_time_secs(&self) -> Option<f64> {
        self.started_at
            .map(|s| (s - self.created_at).num_milliseconds() as f64 / 1000.0)
    }

    /// Seconds spent inside the handler.
    pub fn run_time_secs(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(s), Some(c)) => Some((c - s).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}
