//! Built-in admission stages.

use aconv_models::{ConvertRequest, JobId};
use axum::http::HeaderMap;
use validator::{Validate, ValidationErrors};

use super::{AdmissionContext, AdmissionError, AdmissionStage};
use crate::security::validate_remote_url;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Checks the shared API key.
///
/// With no key configured every request passes.
pub struct ApiKeyStage {
    key: Option<String>,
}

impl ApiKeyStage {
    pub fn new(key: Option<String>) -> Self {
        Self { key }
    }

    /// Verify the key in `headers`. Also used by read-only endpoints.
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), AdmissionError> {
        let Some(expected) = self.key.as_deref() else {
            return Ok(());
        };

        let provided = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AdmissionError::auth("Missing API key"))?;

        if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
            Ok(())
        } else {
            Err(AdmissionError::auth("Invalid API key"))
        }
    }
}

impl AdmissionStage for ApiKeyStage {
    fn name(&self) -> &'static str {
        "api_key"
    }

    fn apply(&self, ctx: &mut AdmissionContext) -> Result<(), AdmissionError> {
        self.verify(&ctx.headers)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Parses the body into a [`ConvertRequest`] and validates it once.
pub struct SchemaStage {
    allow_private_urls: bool,
}

impl SchemaStage {
    pub fn new(allow_private_urls: bool) -> Self {
        Self { allow_private_urls }
    }
}

impl AdmissionStage for SchemaStage {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn apply(&self, ctx: &mut AdmissionContext) -> Result<(), AdmissionError> {
        let request: ConvertRequest = serde_json::from_slice(&ctx.body)
            .map_err(|e| AdmissionError::validation(format!("Invalid request body: {}", e)))?;

        request
            .validate()
            .map_err(|e| AdmissionError::validation(describe(&e)))?;

        validate_remote_url(&request.media_url, self.allow_private_urls)
            .into_result()
            .map_err(|e| AdmissionError::validation(format!("media_url: {}", e)))?;
        if let Some(webhook) = request.webhook_url.as_deref() {
            validate_remote_url(webhook, self.allow_private_urls)
                .into_result()
                .map_err(|e| AdmissionError::validation(format!("webhook_url: {}", e)))?;
        }

        ctx.request = Some(request);
        Ok(())
    }
}

/// `field: message; field: message`, fields sorted.
fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages: Vec<String> = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect();
    fields.sort();
    fields.join("; ")
}

/// Uses the client-supplied `id` as the job id, or generates a UUID v4.
pub struct IdentityStage;

impl AdmissionStage for IdentityStage {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn apply(&self, ctx: &mut AdmissionContext) -> Result<(), AdmissionError> {
        let request = ctx
            .request
            .as_ref()
            .ok_or_else(|| AdmissionError::validation("Request body was not parsed"))?;

        ctx.job_id = Some(match request.id.as_deref() {
            Some(id) => JobId::from(id),
            None => JobId::new(),
        });
        Ok(())
    }
}
