//! Application state.

use std::sync::Arc;

use aconv_queue::{JobQueue, JobRegistry};
use aconv_worker::{JobHandler, ResultReporter};
use tokio::sync::Semaphore;

use crate::admission::AdmissionPipeline;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub queue: Arc<JobQueue>,
    pub handler: Arc<dyn JobHandler>,
    pub reporter: Arc<ResultReporter>,
    pub admission: Arc<AdmissionPipeline>,
    /// Caps inline runs when `INLINE_CONCURRENCY` is set
    pub inline_slots: Option<Arc<Semaphore>>,
    /// Size of the worker pool, reported by /ready
    pub worker_count: usize,
}

impl AppState {
    /// Create new application state with the standard admission gate.
    pub fn new(
        config: ApiConfig,
        queue: Arc<JobQueue>,
        handler: Arc<dyn JobHandler>,
        reporter: Arc<ResultReporter>,
        worker_count: usize,
    ) -> Self {
        let admission = Arc::new(AdmissionPipeline::from_config(&config));
        let inline_slots = config
            .inline_concurrency
            .map(|n| Arc::new(Semaphore::new(n)));
        Self {
            config,
            queue,
            handler,
            reporter,
            admission,
            inline_slots,
            worker_count,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        self.queue.registry()
    }
}
