//! Shared data models for the aconv job engine.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, their identity and lifecycle state machine
//! - The typed media-to-mp3 request
//! - Terminal outcomes and webhook callback payloads
//! - Webhook delivery bookkeeping

pub mod callback;
pub mod delivery;
pub mod job;
pub mod outcome;
pub mod request;

// Re-export common types
pub use callback::CallbackPayload;
pub use delivery::DeliveryStatus;
pub use job::{ExecutionMode, InvalidTransition, Job, JobId, JobStatus};
pub use outcome::{JobOutcome, OutcomeBody};
pub use request::{ConvertRequest, DEFAULT_BITRATE};
