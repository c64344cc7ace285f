//! Job status endpoint.

use aconv_models::{DeliveryStatus, ExecutionMode, Job, JobId, JobOutcome, JobStatus};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::admission::ApiKeyStage;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Snapshot of a tracked job.
#[derive(Debug, Serialize)]
pub struct JobView {
    pub job_id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub route: String,
    pub mode: ExecutionMode,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub queue_time_secs: Option<f64>,
    pub run_time_secs: Option<f64>,
    pub outcome: Option<JobOutcome>,
    pub delivery: DeliveryStatus,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            queue_time_secs: job.queue_time_secs(),
            run_time_secs: job.run_time_secs(),
            job_id: job.id,
            id: job.request.id,
            route: job.route,
            mode: job.mode,
            status: job.status,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            outcome: job.outcome,
            delivery: job.delivery,
        }
    }
}

/// GET /jobs/:job_id
pub async fn get_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    ApiKeyStage::new(state.config.api_key.clone()).verify(&headers)?;

    let job = state
        .registry()
        .get(&JobId::from(job_id.as_str()))
        .await
        .ok_or_else(|| ApiError::not_found(format!("Job {}", job_id)))?;

    Ok(Json(job.into()))
}
