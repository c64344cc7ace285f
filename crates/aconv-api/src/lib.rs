//! Axum HTTP API server for the aconv job engine.
//!
//! This crate provides:
//! - The admission gate (API key, schema validation, job identity)
//! - Bypass/queued dispatch for `POST /media-to-mp3`
//! - Job status, health and readiness endpoints
//! - Rate limiting, security headers and Prometheus metrics

pub mod admission;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod state;

pub use admission::{AdmissionError, AdmissionPipeline, AdmissionStage};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
