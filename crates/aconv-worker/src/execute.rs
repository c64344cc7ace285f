//! Captured job execution shared by the pool and the bypass path.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use aconv_models::{ExecutionMode, Job, JobId, JobOutcome};
use aconv_queue::{JobRegistry, QueueResult};
use futures::FutureExt;
use tracing::Instrument;

use crate::handler::JobHandler;
use crate::logging::JobLogger;
use crate::metrics::record_job_finished;

/// Invoke the handler for a running job and turn whatever happens into an
/// outcome. Handler errors and panics become failure outcomes (code 500).
pub async fn execute_captured(handler: &dyn JobHandler, job: &Job) -> JobOutcome {
    let logger = JobLogger::new(&job.id, &job.route, job.mode);
    logger.log_start(&job.request.media_url);

    let run = AssertUnwindSafe(handler.handle(&job.id, &job.request)).catch_unwind();
    let result = run.instrument(logger.create_span()).await;

    let client_id = job.request.id.clone();
    match result {
        Ok(Ok(url)) => {
            logger.log_completion(&url);
            JobOutcome::success(job.id.clone(), client_id, &job.route, url)
        }
        Ok(Err(e)) => {
            let message = e.to_string();
            logger.log_error(&message);
            JobOutcome::failure(job.id.clone(), client_id, &job.route, message)
        }
        Err(panic) => {
            let message = format!("Handler panicked: {}", panic_message(panic.as_ref()));
            logger.log_error(&message);
            JobOutcome::failure(job.id.clone(), client_id, &job.route, message)
        }
    }
}

/// Claim a queued job, run it under capture, and record the terminal state.
///
/// Returns the terminal job. Fails only if the claim is lost (the job is
/// missing or not `queued`), in which case the handler is not invoked.
pub async fn run_job(
    registry: &JobRegistry,
    handler: &dyn JobHandler,
    job_id: &JobId,
) -> QueueResult<Job> {
    let job = registry.claim(job_id).await?;
    let outcome = execute_captured(handler, &job).await;
    let succeeded = outcome.is_success();

    let done = registry.complete(job_id, outcome).await?;

    let mode = match done.mode {
        ExecutionMode::Queued => "queued",
        ExecutionMode::Bypass => "bypass",
    };
    record_job_finished(
        &done.route,
        mode,
        succeeded,
        done.run_time_secs().unwrap_or_default(),
    );
    Ok(done)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HandlerError, HandlerResult};
    use aconv_models::{ConvertRequest, JobStatus};
    use async_trait::async_trait;

    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct TestHandler(Behaviour);

    #[async_trait]
    impl JobHandler for TestHandler {
        async fn handle(&self, job_id: &JobId, request: &ConvertRequest) -> HandlerResult<String> {
            match self.0 {
                Behaviour::Succeed => Ok(format!("https://cdn/{}-{}.mp3", job_id, request.bitrate())),
                Behaviour::Fail => Err(HandlerError::conversion("unsupported codec")),
                Behaviour::Panic => panic!("decoder exploded"),
            }
        }
    }

    async fn queued(registry: &JobRegistry, id: &str) -> JobId {
        let job_id = JobId::from(id);
        registry
            .create(Job::new(
                job_id.clone(),
                ConvertRequest::new("https://example.com/a.mp4").with_id("client-1"),
                "/media-to-mp3",
                ExecutionMode::Queued,
            ))
            .await
            .unwrap();
        job_id
    }

    #[tokio::test]
    async fn test_success_marks_succeeded() {
        let registry = JobRegistry::new();
        let id = queued(&registry, "ok").await;

        let job = run_job(&registry, &TestHandler(Behaviour::Succeed), &id)
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Succeeded);
        let outcome = job.outcome.unwrap();
        assert_eq!(outcome.code, 200);
        assert_eq!(outcome.result(), Some("https://cdn/ok-128k.mp3"));
        assert_eq!(outcome.id.as_deref(), Some("client-1"));
    }

    #[tokio::test]
    async fn test_handler_error_is_captured() {
        let registry = JobRegistry::new();
        let id = queued(&registry, "bad").await;

        let job = run_job(&registry, &TestHandler(Behaviour::Fail), &id)
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        let outcome = job.outcome.unwrap();
        assert_eq!(outcome.code, 500);
        assert_eq!(outcome.error(), Some("Conversion failed: unsupported codec"));
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let registry = JobRegistry::new();
        let id = queued(&registry, "boom").await;

        let job = run_job(&registry, &TestHandler(Behaviour::Panic), &id)
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job
            .outcome
            .unwrap()
            .error()
            .unwrap()
            .contains("decoder exploded"));
    }

    #[tokio::test]
    async fn test_lost_claim_skips_handler() {
        let registry = JobRegistry::new();
        let id = queued(&registry, "twice").await;
        registry.claim(&id).await.unwrap();

        assert!(run_job(&registry, &TestHandler(Behaviour::Panic), &id)
            .await
            .is_err());
        assert_eq!(registry.get(&id).await.unwrap().status, JobStatus::Running);
    }
}
