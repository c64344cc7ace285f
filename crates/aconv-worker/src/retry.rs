//! Retry utilities with exponential backoff.
//!
//! Used for webhook delivery, where only transient failures are worth another
//! attempt.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::WebhookConfig;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry (doubles each further retry).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    /// Backoff settings for webhook delivery.
    pub fn for_webhook(config: &WebhookConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            operation_name: "webhook_delivery".to_string(),
        }
    }

    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the base delay for exponential backoff.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the cap on a single delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31);
        let delay = self.base_delay.saturating_mul(2u32.pow(exp));
        delay.min(self.max_delay)
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Success { value: T, attempts: u32 },
    /// Operation failed permanently or after all attempts were used.
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    /// Returns true if the operation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success { .. })
    }

    /// Number of attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryResult::Success { attempts, .. } | RetryResult::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Execute an async operation, retrying failures accepted by `should_retry`.
///
/// # Example
/// ```ignore
/// let config = RetryConfig::new("webhook_delivery").with_max_attempts(4);
/// let result = retry_async(&config, DeliveryError::is_transient, || async {
///     client.send_once(url, &body).await
/// }).await;
/// ```
pub async fn retry_async<F, Fut, T, E, R>(
    config: &RetryConfig,
    should_retry: R,
    operation: F,
) -> RetryResult<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                return RetryResult::Success {
                    value,
                    attempts: attempt,
                }
            }
            Err(e) if attempt < config.max_attempts && should_retry(&e) => {
                let delay = config.delay_for_retry(attempt);
                debug!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    config.operation_name, attempt, delay, e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return RetryResult::Failed {
                    error: e,
                    attempts: attempt,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retry_config_delay_calculation() {
        let config = RetryConfig::new("test")
            .with_base_delay(Duration::from_millis(1000))
            .with_max_delay(Duration::from_millis(8000));

        assert_eq!(config.delay_for_retry(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for_retry(2), Duration::from_millis(2000));
        assert_eq!(config.delay_for_retry(3), Duration::from_millis(4000));
        assert_eq!(config.delay_for_retry(4), Duration::from_millis(8000));
        assert_eq!(config.delay_for_retry(9), Duration::from_millis(8000));
    }

    #[test]
    fn test_webhook_settings() {
        let config = RetryConfig::for_webhook(&WebhookConfig::default());
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.delay_for_retry(1), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_retry_async_immediate_success() {
        let config = RetryConfig::new("test");
        let call_count = AtomicU32::new(0);

        let result = retry_async(&config, |_: &String| true, || {
            call_count.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(42) }
        })
        .await;

        assert!(result.is_success());
        assert_eq!(result.attempts(), 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_async_eventual_success() {
        let config = RetryConfig::new("test").with_base_delay(Duration::from_millis(1));
        let call_count = AtomicU32::new(0);

        let result = retry_async(&config, |_| true, || {
            let count = call_count.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err("transient error")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        match result {
            RetryResult::Success { value, attempts } => {
                assert_eq!(value, 42);
                assert_eq!(attempts, 3);
            }
            RetryResult::Failed { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_retry_async_exhausts_attempts() {
        let config = RetryConfig::new("test")
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(1));
        let call_count = AtomicU32::new(0);

        let result = retry_async(&config, |_| true, || {
            call_count.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("down") }
        })
        .await;

        assert!(!result.is_success());
        assert_eq!(result.attempts(), 3);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_async_stops_on_permanent_error() {
        let config = RetryConfig::new("test").with_base_delay(Duration::from_millis(1));
        let call_count = AtomicU32::new(0);

        let result = retry_async(&config, |e: &&str| *e != "permanent", || {
            call_count.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("permanent") }
        })
        .await;

        assert_eq!(result.attempts(), 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
