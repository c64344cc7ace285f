//! Body POSTed to a caller's webhook.

use serde::{Deserialize, Serialize};

use crate::{Job, JobId, JobOutcome, JobStatus, OutcomeBody};

/// `{job_id, id?, status, result | error, route, code, queue_time_secs, run_time_secs}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: JobStatus,
    #[serde(flatten)]
    pub body: OutcomeBody,
    pub route: String,
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_time_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time_secs: Option<f64>,
}

impl CallbackPayload {
    /// Build from a terminal job. Returns `None` while the job has no outcome.
    pub fn from_job(job: &Job) -> Option<Self> {
        let outcome = job.outcome.as_ref()?;
        Some(Self::from_outcome(
            outcome,
            job.queue_time_secs(),
            job.run_time_secs(),
        ))
    }

    pub fn from_outcome(
        outcome: &JobOutcome,
        queue_time_secs: Option<f64>,
        run_time_secs: Option<f64>,
    ) -> Self {
        Self {
            job_id: outcome.job_id.clone(),
            id: outcome.id.clone(),
            status: outcome.status,
            body: outcome.body.clone(),
            route: outcome.route.clone(),
            code: outcome.code,
            queue_time_secs,
            run_time_secs,
        }
    }
}
