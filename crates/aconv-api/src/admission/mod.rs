//! Admission gate.
//!
//! Every request passes an ordered [`AdmissionPipeline`] of stages
//! (authenticate, validate, assign identity) before anything reaches the
//! job core. The first failing stage short-circuits the rest. The admitted
//! request is then handed to [`dispatch`], which runs it inline or queues it.

mod dispatch;
mod stages;

use aconv_models::{ConvertRequest, JobId};
use axum::body::Bytes;
use axum::http::HeaderMap;
use thiserror::Error;

pub use dispatch::{dispatch, Dispatched, RouteSpec, MEDIA_TO_MP3};
pub use stages::{ApiKeyStage, IdentityStage, SchemaStage, API_KEY_HEADER};

use crate::config::ApiConfig;

/// Reasons a request is refused at the gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Validation(String),
}

impl AdmissionError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Request state threaded through the stages.
#[derive(Debug)]
pub struct AdmissionContext {
    pub headers: HeaderMap,
    pub body: Bytes,
    pub request: Option<ConvertRequest>,
    pub job_id: Option<JobId>,
}

impl AdmissionContext {
    pub fn new(headers: HeaderMap, body: Bytes) -> Self {
        Self {
            headers,
            body,
            request: None,
            job_id: None,
        }
    }
}

/// A request that passed every stage.
#[derive(Debug, Clone)]
pub struct Admitted {
    pub job_id: JobId,
    pub request: ConvertRequest,
}

impl Admitted {
    /// Callback URL, if the caller asked for one.
    pub fn callback_url(&self) -> Option<&str> {
        self.request.webhook_url.as_deref()
    }
}

/// One step of the admission gate.
pub trait AdmissionStage: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn apply(&self, ctx: &mut AdmissionContext) -> Result<(), AdmissionError>;
}

/// Ordered list of stages.
pub struct AdmissionPipeline {
    stages: Vec<Box<dyn AdmissionStage>>,
}

impl AdmissionPipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage; stages run in insertion order.
    pub fn stage(mut self, stage: impl AdmissionStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// The standard gate: API key, schema, identity.
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new()
            .stage(ApiKeyStage::new(config.api_key.clone()))
            .stage(SchemaStage::new(config.allow_private_urls))
            .stage(IdentityStage)
    }

    /// Run all stages against a raw request.
    pub fn admit(&self, headers: HeaderMap, body: Bytes) -> Result<Admitted, AdmissionError> {
        let mut ctx = AdmissionContext::new(headers, body);

        for stage in &self.stages {
            if let Err(e) = stage.apply(&mut ctx) {
                tracing::debug!(stage = stage.name(), "Request refused: {}", e);
                return Err(e);
            }
        }

        match (ctx.request, ctx.job_id) {
            (Some(request), Some(job_id)) => Ok(Admitted { job_id, request }),
            (None, _) => Err(AdmissionError::validation("Request body was not parsed")),
            (_, None) => Err(AdmissionError::validation("No job id was assigned")),
        }
    }
}

impl Default for AdmissionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    impl AdmissionStage for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn apply(&self, _ctx: &mut AdmissionContext) -> Result<(), AdmissionError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn body(json: &str) -> Bytes {
        Bytes::from(json.to_string())
    }

    fn keyed_headers(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key.parse().unwrap());
        headers
    }

    #[test]
    fn test_admits_valid_request() {
        let pipeline = AdmissionPipeline::from_config(&ApiConfig {
            api_key: Some("k".to_string()),
            ..ApiConfig::default()
        });

        let admitted = pipeline
            .admit(
                keyed_headers("k"),
                body(r#"{"media_url":"https://example.com/a.mp4","id":"mine","webhook_url":"https://hooks.example.com/x"}"#),
            )
            .unwrap();

        assert_eq!(admitted.job_id.as_str(), "mine");
        assert_eq!(admitted.callback_url(), Some("https://hooks.example.com/x"));
    }

    #[test]
    fn test_auth_failure_short_circuits() {
        let seen = Arc::new(AtomicUsize::new(0));
        let pipeline = AdmissionPipeline::new()
            .stage(ApiKeyStage::new(Some("k".to_string())))
            .stage(Counting(seen.clone()));

        let err = pipeline
            .admit(keyed_headers("wrong"), body("{}"))
            .unwrap_err();

        assert!(matches!(err, AdmissionError::Auth(_)));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_validation_happens_before_identity() {
        let pipeline = AdmissionPipeline::from_config(&ApiConfig::default());

        let err = pipeline
            .admit(HeaderMap::new(), body(r#"{"media_url":"https://example.com/a.mp4","bitrate":"fast"}"#))
            .unwrap_err();

        assert!(matches!(err, AdmissionError::Validation(ref m) if m.contains("bitrate")));
    }

    #[test]
    fn test_incomplete_pipeline_is_refused() {
        let pipeline = AdmissionPipeline::new().stage(SchemaStage::new(false));

        let err = pipeline
            .admit(HeaderMap::new(), body(r#"{"media_url":"https://example.com/a.mp4"}"#))
            .unwrap_err();

        assert!(matches!(err, AdmissionError::Validation(_)));
    }
}
