//! Terminal outcome reporting.

use std::sync::Arc;

use aconv_models::{CallbackPayload, DeliveryStatus, Job};
use aconv_queue::JobRegistry;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::metrics::record_webhook_delivery;
use crate::webhook::{DeliveryReport, WebhookClient};

/// Hands terminal outcomes to webhooks.
///
/// Delivery runs on its own task and writes only the job's `delivery`
/// bookkeeping; the job status is never touched. Jobs without a webhook need
/// nothing: bypass callers get the outcome inline and queued jobs stay
/// pollable in the registry.
pub struct ResultReporter {
    registry: Arc<JobRegistry>,
    webhook: WebhookClient,
}

impl ResultReporter {
    pub fn new(registry: Arc<JobRegistry>, webhook: WebhookClient) -> Self {
        Self { registry, webhook }
    }

    /// Start delivery for a terminal job. Returns the delivery task, if any.
    pub fn report(&self, job: &Job) -> Option<JoinHandle<()>> {
        let url = job.request.webhook_url.clone()?;
        let Some(payload) = CallbackPayload::from_job(job) else {
            warn!(job_id = %job.id, status = %job.status, "Refusing to report a non-terminal job");
            return None;
        };

        let registry = Arc::clone(&self.registry);
        let webhook = self.webhook.clone();
        let job_id = job.id.clone();

        Some(tokio::spawn(async move {
            let delivery = match webhook.deliver(&url, &payload).await {
                DeliveryReport::Delivered { attempts } => {
                    info!(job_id = %job_id, attempts, "Result delivered to webhook");
                    record_webhook_delivery("delivered", attempts);
                    DeliveryStatus::Delivered { attempts }
                }
                DeliveryReport::Failed { attempts, error } => {
                    error!(
                        job_id = %job_id,
                        attempts,
                        "Giving up on webhook delivery: {}", error
                    );
                    record_webhook_delivery("failed", attempts);
                    DeliveryStatus::Failed {
                        attempts,
                        error: error.to_string(),
                    }
                }
            };

            // The job may have been evicted meanwhile.
            if let Err(e) = registry.record_delivery(&job_id, delivery).await {
                warn!(job_id = %job_id, "Could not record webhook delivery: {}", e);
            }
        }))
    }
}
