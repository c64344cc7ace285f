//! Job execution for the aconv engine.
//!
//! This crate provides:
//! - `JobHandler` and the media-to-mp3 handler
//! - Captured execution shared by queued and bypass runs
//! - `WorkerPool`: fixed executors pulling from the job queue
//! - `ResultReporter` / `WebhookClient`: retried, signed result delivery

pub mod config;
pub mod error;
pub mod execute;
pub mod executor;
pub mod handler;
pub mod logging;
pub mod metrics;
pub mod reporter;
pub mod retry;
pub mod webhook;

pub use config::{WebhookConfig, WorkerConfig};
pub use error::{DeliveryError, HandlerError, HandlerResult};
pub use execute::{execute_captured, run_job};
pub use executor::WorkerPool;
pub use handler::{JobHandler, MediaToMp3Handler};
pub use logging::JobLogger;
pub use reporter::ResultReporter;
pub use webhook::{DeliveryReport, WebhookClient, SIGNATURE_HEADER};
