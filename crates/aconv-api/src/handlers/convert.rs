//! Conversion endpoint.

use aconv_models::JobId;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::admission::{dispatch, Dispatched, MEDIA_TO_MP3};
use crate::error::ApiResult;
use crate::state::AppState;

/// Body returned with 202 when a job is queued.
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub job_id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: &'static str,
    pub queue_length: usize,
    pub route: &'static str,
}

/// POST /media-to-mp3
///
/// Inline runs answer with the outcome and its code (200/500); queued runs
/// answer 202 with the job id.
pub async fn media_to_mp3(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let admitted = state.admission.admit(headers, body)?;

    match dispatch(&state, MEDIA_TO_MP3, admitted).await? {
        Dispatched::Completed(outcome) => {
            let status =
                StatusCode::from_u16(outcome.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            Ok((status, Json(outcome)).into_response())
        }
        Dispatched::Queued {
            job_id,
            id,
            queue_length,
        } => Ok((
            StatusCode::ACCEPTED,
            Json(QueuedResponse {
                job_id,
                id,
                status: "queued",
                queue_length,
                route: MEDIA_TO_MP3.path,
            }),
        )
            .into_response()),
    }
}
