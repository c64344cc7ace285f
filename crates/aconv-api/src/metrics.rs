//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "aconv_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "aconv_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "aconv_http_requests_in_flight";

    // Admission metrics
    pub const JOBS_ENQUEUED_TOTAL: &str = "aconv_jobs_enqueued_total";
    pub const JOBS_REJECTED_TOTAL: &str = "aconv_jobs_rejected_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "aconv_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record job enqueued.
pub fn record_job_enqueued(route: &str) {
    let labels = [("route", route.to_string())];
    counter!(names::JOBS_ENQUEUED_TOTAL, &labels).increment(1);
}

/// Record job refused by the queue.
pub fn record_job_rejected(route: &str, reason: &str) {
    let labels = [("route", route.to_string()), ("reason", reason.to_string())];
    counter!(names::JOBS_REJECTED_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static JOB_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/jobs/[^/]+").expect("static job path pattern"));

/// Sanitize path for metrics labels (job ids are caller-chosen and unbounded).
fn sanitize_path(path: &str) -> String {
    JOB_PATH_RE.replace_all(path, "/jobs/:job_id").to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
