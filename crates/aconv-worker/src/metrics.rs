//! Worker-side metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_COMPLETED_TOTAL: &str = "aconv_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "aconv_jobs_failed_total";
    pub const JOB_RUN_DURATION_SECONDS: &str = "aconv_job_run_duration_seconds";
    pub const WEBHOOK_DELIVERIES_TOTAL: &str = "aconv_webhook_deliveries_total";
    pub const WEBHOOK_ATTEMPTS: &str = "aconv_webhook_attempts";
}

/// Record a terminal job.
pub fn record_job_finished(route: &str, mode: &str, succeeded: bool, duration_secs: f64) {
    let labels = [("route", route.to_string()), ("mode", mode.to_string())];
    if succeeded {
        counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
    } else {
        counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
    }
    histogram!(names::JOB_RUN_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a settled webhook delivery (`delivered` or `failed`).
pub fn record_webhook_delivery(outcome: &'static str, attempts: u32) {
    counter!(names::WEBHOOK_DELIVERIES_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::WEBHOOK_ATTEMPTS).record(attempts as f64);
}
