//! Webhook delivery with exponential-backoff retry.
//!
//! [`WebhookClient`] POSTs a JSON [`CallbackPayload`] to a caller-supplied URL.
//! Transport failures, 5xx and 429 responses are retried; any other non-2xx
//! response ends delivery immediately.

use aconv_models::CallbackPayload;
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::config::WebhookConfig;
use crate::error::DeliveryError;
use crate::retry::{retry_async, RetryConfig, RetryResult};

/// Header carrying `sha256=<base64 HMAC-SHA256 of the body>`.
pub const SIGNATURE_HEADER: &str = "X-Aconv-Signature";

/// Settled delivery.
#[derive(Debug)]
pub enum DeliveryReport {
    Delivered { attempts: u32 },
    Failed { attempts: u32, error: DeliveryError },
}

/// Delivers callback payloads to webhook endpoints.
#[derive(Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    retry: RetryConfig,
    signing_secret: Option<String>,
}

impl WebhookClient {
    pub fn new(config: &WebhookConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("aconv/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            retry: RetryConfig::for_webhook(config),
            signing_secret: config.signing_secret.clone(),
        })
    }

    /// Deliver a payload, retrying transient failures.
    pub async fn deliver(&self, url: &str, payload: &CallbackPayload) -> DeliveryReport {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(e) => {
                return DeliveryReport::Failed {
                    attempts: 0,
                    error: DeliveryError::Payload(e.to_string()),
                }
            }
        };
        let signature = match self.signing_secret.as_deref().map(|s| sign(s, &body)) {
            Some(Ok(signature)) => Some(signature),
            Some(Err(error)) => return DeliveryReport::Failed { attempts: 0, error },
            None => None,
        };

        let result = retry_async(&self.retry, DeliveryError::is_transient, || {
            self.try_send(url, &body, signature.as_deref())
        })
        .await;

        match result {
            RetryResult::Success { attempts, .. } => {
                debug!(url, attempts, "Webhook delivered");
                DeliveryReport::Delivered { attempts }
            }
            RetryResult::Failed { error, attempts } => {
                warn!(url, attempts, error = %error, "Webhook delivery failed");
                DeliveryReport::Failed { attempts, error }
            }
        }
    }

    /// Execute a single POST and check the response status.
    async fn try_send(
        &self,
        url: &str,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec());
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// `sha256=<base64(HMAC-SHA256(secret, body))>`
pub fn sign(secret: &str, body: &[u8]) -> Result<String, DeliveryError> {
    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| DeliveryError::Payload(format!("Invalid signing key: {}", e)))?;
    mac.update(body);
    Ok(format!("sha256={}", STANDARD.encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_stable() {
        let a = sign("secret", br#"{"job_id":"j1"}"#).unwrap();
        let b = sign("secret", br#"{"job_id":"j1"}"#).unwrap();
        let c = sign("other", br#"{"job_id":"j1"}"#).unwrap();

        assert!(a.starts_with("sha256="));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_client_builds() {
        assert!(WebhookClient::new(&WebhookConfig::default()).is_ok());
    }
}
