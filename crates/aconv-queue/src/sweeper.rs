//! Background eviction of expired terminal jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info};

use crate::queue::QueueConfig;
use crate::registry::JobRegistry;

/// Periodically evicts terminal jobs older than the retention TTL.
pub struct RetentionSweeper {
    registry: Arc<JobRegistry>,
    retention: Duration,
    sweep_interval: Duration,
}

impl RetentionSweeper {
    pub fn new(registry: Arc<JobRegistry>, config: &QueueConfig) -> Self {
        Self {
            registry,
            retention: config.retention,
            sweep_interval: config.sweep_interval,
        }
    }

    /// Run one sweep. Returns the number of evicted jobs.
    pub async fn sweep(&self) -> usize {
        self.registry.evict_expired(self.retention).await
    }

    /// Sweep until `shutdown` flips to `true`.
    ///
    /// Should be spawned as a background task.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting retention sweeper (interval: {:?}, retention: {:?})",
            self.sweep_interval, self.retention
        );

        let mut ticker = interval(self.sweep_interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.sweep().await;
                    debug!(evicted, "Retention sweep complete");
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Retention sweeper stopping");
                        break;
                    }
                }
            }
        }
    }
}
