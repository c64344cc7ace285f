//! Health check handlers.

use std::time::Instant;

use aconv_queue::JobCounts;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub queue: QueueSnapshot,
    pub workers: usize,
    pub jobs: JobCounts,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct QueueSnapshot {
    pub depth: usize,
    pub capacity: usize,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub queue: CheckStatus,
    pub ffmpeg: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness check endpoint (readiness probe).
/// Reports queue depth and worker count; fails when the queue is closed or
/// FFmpeg is missing.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let queue_check = {
        let start = Instant::now();
        if state.queue.is_closed().await {
            CheckStatus::error("queue is closed")
        } else {
            CheckStatus::ok(start.elapsed().as_millis() as u64)
        }
    };

    let ffmpeg_check = {
        let start = Instant::now();
        match aconv_media::check_ffmpeg() {
            Ok(_) => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let all_ok = queue_check.is_ok() && ffmpeg_check.is_ok() && state.worker_count > 0;

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        queue: QueueSnapshot {
            depth: state.queue.len().await,
            capacity: state.queue.capacity(),
        },
        workers: state.worker_count,
        jobs: state.registry().counts().await,
        checks: ReadinessChecks {
            queue: queue_check,
            ffmpeg: ffmpeg_check,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
