//! Execution path selection for admitted requests.

use std::sync::Arc;

use aconv_models::{ExecutionMode, Job, JobId, JobOutcome};
use aconv_queue::QueueError;
use aconv_worker::run_job;
use tracing::{info, warn};

use super::Admitted;
use crate::error::{ApiError, ApiResult};
use crate::metrics::{record_job_enqueued, record_job_rejected};
use crate::state::AppState;

/// Per-route dispatch settings.
#[derive(Debug, Clone, Copy)]
pub struct RouteSpec {
    pub path: &'static str,
    /// Always run inline, even when a webhook is supplied
    pub bypass_queue: bool,
}

pub const MEDIA_TO_MP3: RouteSpec = RouteSpec {
    path: "/media-to-mp3",
    bypass_queue: false,
};

/// What happened to an admitted request.
#[derive(Debug)]
pub enum Dispatched {
    /// Ran inline; the terminal outcome is returned to the caller.
    Completed(JobOutcome),
    /// Accepted onto the queue.
    Queued {
        job_id: JobId,
        id: Option<String>,
        queue_length: usize,
    },
}

impl RouteSpec {
    /// Bypass when the route demands it, or when there is nowhere to send a
    /// later result and inline execution is enabled.
    pub fn runs_inline(&self, admitted: &Admitted, sync_without_webhook: bool) -> bool {
        self.bypass_queue || (admitted.callback_url().is_none() && sync_without_webhook)
    }
}

/// Run an admitted request inline or enqueue it.
pub async fn dispatch(state: &AppState, route: RouteSpec, admitted: Admitted) -> ApiResult<Dispatched> {
    if route.runs_inline(&admitted, state.config.sync_without_webhook) {
        run_inline(state, route, admitted).await
    } else {
        enqueue(state, route, admitted).await
    }
}

async fn run_inline(state: &AppState, route: RouteSpec, admitted: Admitted) -> ApiResult<Dispatched> {
    let Admitted { job_id, request } = admitted;

    let permit = match &state.inline_slots {
        Some(slots) => Some(
            Arc::clone(slots)
                .acquire_owned()
                .await
                .map_err(|_| ApiError::unavailable("Inline execution is closed"))?,
        ),
        None => None,
    };

    let registry = Arc::clone(state.registry());
    registry
        .create(Job::new(job_id.clone(), request, route.path, ExecutionMode::Bypass))
        .await?;

    // Detached from the request future: a dropped connection must not leave
    // the job stuck in `running`.
    let handler = Arc::clone(&state.handler);
    let reporter = Arc::clone(&state.reporter);
    let task_job_id = job_id.clone();
    let task = tokio::spawn(async move {
        let _permit = permit;
        let job = run_job(&registry, handler.as_ref(), &task_job_id).await?;
        reporter.report(&job);
        Ok::<_, QueueError>(job)
    });

    let job = task
        .await
        .map_err(|e| ApiError::internal(format!("Inline job {} aborted: {}", job_id, e)))??;

    job.outcome
        .map(Dispatched::Completed)
        .ok_or_else(|| ApiError::internal(format!("Job {} finished without an outcome", job_id)))
}

async fn enqueue(state: &AppState, route: RouteSpec, admitted: Admitted) -> ApiResult<Dispatched> {
    let Admitted { job_id, request } = admitted;
    let id = request.id.clone();
    let job = Job::new(job_id.clone(), request, route.path, ExecutionMode::Queued);

    match state.queue.enqueue(job).await {
        Ok(queue_length) => {
            info!(job_id = %job_id, queue_length, "Job queued");
            record_job_enqueued(route.path);
            Ok(Dispatched::Queued {
                job_id,
                id,
                queue_length,
            })
        }
        Err(e) => {
            let reason = match &e {
                QueueError::Backpressure { .. } => "backpressure",
                QueueError::DuplicateJob(_) => "duplicate",
                _ => "other",
            };
            warn!(job_id = %job_id, "Job rejected: {}", e);
            record_job_rejected(route.path, reason);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use aconv_models::{ConvertRequest, JobStatus};
    use aconv_queue::{JobQueue, JobRegistry};
    use aconv_worker::{HandlerResult, JobHandler, ResultReporter, WebhookClient, WebhookConfig};
    use async_trait::async_trait;
    use chrono::Utc;

    use crate::config::ApiConfig;

    /// Sleeps, then succeeds; tracks the peak number of concurrent runs.
    struct SlowHandler {
        delay: Duration,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowHandler {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl JobHandler for SlowHandler {
        async fn handle(&self, job_id: &JobId, _request: &ConvertRequest) -> HandlerResult<String> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("https://cdn.example.com/audio/{job_id}.mp3"))
        }
    }

    fn state(config: ApiConfig, handler: Arc<SlowHandler>) -> AppState {
        let registry = Arc::new(JobRegistry::new());
        let queue = Arc::new(JobQueue::new(registry.clone(), 4));
        let reporter = Arc::new(ResultReporter::new(
            registry,
            WebhookClient::new(&WebhookConfig::default()).unwrap(),
        ));
        AppState::new(config, queue, handler, reporter, 1)
    }

    fn admitted(webhook: Option<&str>) -> Admitted {
        admitted_as("j", webhook)
    }

    fn admitted_as(id: &str, webhook: Option<&str>) -> Admitted {
        let mut request = ConvertRequest::new("https://example.com/a.mp4");
        request.webhook_url = webhook.map(str::to_string);
        Admitted {
            job_id: JobId::from(id),
            request,
        }
    }

    #[test]
    fn test_bypass_rule() {
        let route = MEDIA_TO_MP3;
        assert!(route.runs_inline(&admitted(None), true));
        assert!(!route.runs_inline(&admitted(None), false));
        assert!(!route.runs_inline(&admitted(Some("https://hooks.example.com")), true));

        let forced = RouteSpec {
            bypass_queue: true,
            ..MEDIA_TO_MP3
        };
        assert!(forced.runs_inline(&admitted(Some("https://hooks.example.com")), false));
    }

    #[tokio::test]
    async fn test_inline_job_survives_dropped_request() {
        let handler = Arc::new(SlowHandler::new(Duration::from_millis(200)));
        let state = state(ApiConfig::default(), handler);
        let id = JobId::from("client-1");

        let dropped = tokio::time::timeout(
            Duration::from_millis(20),
            dispatch(&state, MEDIA_TO_MP3, admitted_as("client-1", None)),
        )
        .await;
        assert!(dropped.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;

        let job = state.registry().get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);

        let later = Utc::now() + chrono::Duration::seconds(1);
        assert_eq!(
            state.registry().evict_expired_at(later, Duration::ZERO).await,
            1
        );

        let again = dispatch(&state, MEDIA_TO_MP3, admitted_as("client-1", None))
            .await
            .unwrap();
        assert!(matches!(again, Dispatched::Completed(outcome) if outcome.is_success()));
    }

    #[tokio::test]
    async fn test_inline_concurrency_cap() {
        let handler = Arc::new(SlowHandler::new(Duration::from_millis(50)));
        let config = ApiConfig {
            inline_concurrency: Some(1),
            ..ApiConfig::default()
        };
        let state = state(config, handler.clone());

        let (a, b, c) = tokio::join!(
            dispatch(&state, MEDIA_TO_MP3, admitted_as("a", None)),
            dispatch(&state, MEDIA_TO_MP3, admitted_as("b", None)),
            dispatch(&state, MEDIA_TO_MP3, admitted_as("c", None)),
        );

        for result in [a, b, c] {
            assert!(matches!(result, Ok(Dispatched::Completed(_))));
        }
        assert_eq!(handler.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inline_runs_unbounded_by_default() {
        let handler = Arc::new(SlowHandler::new(Duration::from_millis(100)));
        let state = state(ApiConfig::default(), handler.clone());

        let (a, b) = tokio::join!(
            dispatch(&state, MEDIA_TO_MP3, admitted_as("a", None)),
            dispatch(&state, MEDIA_TO_MP3, admitted_as("b", None)),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(handler.peak.load(Ordering::SeqCst), 2);
    }
}
