//! Worker and webhook configuration.

use std::time::Duration;

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of executors pulling from the queue
    pub concurrency: usize,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Work directory for converted artifacts
    pub work_dir: String,
    /// Upper bound for a single FFmpeg conversion
    pub convert_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            shutdown_timeout: Duration::from_secs(30),
            work_dir: "/tmp/aconv".to_string(),
            convert_timeout: Duration::from_secs(1800), // 30 minutes
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            concurrency: std::env::var("WORKER_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(2),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or_else(|_| "/tmp/aconv".to_string()),
            convert_timeout: Duration::from_secs(
                std::env::var("CONVERT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
        }
    }
}

/// Webhook delivery configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
    /// Cap on a single retry delay
    pub max_delay: Duration,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// When set, deliveries carry an HMAC-SHA256 signature header
    pub signing_secret: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
            timeout: Duration::from_secs(10),
            signing_secret: None,
        }
    }
}

impl WebhookConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_attempts: std::env::var("WEBHOOK_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(4),
            base_delay: Duration::from_millis(
                std::env::var("WEBHOOK_BASE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            max_delay: Duration::from_millis(
                std::env::var("WEBHOOK_MAX_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8000),
            ),
            timeout: Duration::from_secs(
                std::env::var("WEBHOOK_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            signing_secret: std::env::var("WEBHOOK_SIGNING_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}
