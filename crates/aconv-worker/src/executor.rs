//! Worker pool.

use std::sync::Arc;

use aconv_models::JobId;
use aconv_queue::JobQueue;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::execute::run_job;
use crate::handler::JobHandler;
use crate::reporter::ResultReporter;

/// Fixed set of executors pulling jobs from a shared queue.
pub struct WorkerPool {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    handler: Arc<dyn JobHandler>,
    reporter: Arc<ResultReporter>,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    /// Create a new worker pool.
    pub fn new(
        config: WorkerConfig,
        queue: Arc<JobQueue>,
        handler: Arc<dyn JobHandler>,
        reporter: Arc<ResultReporter>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            queue,
            handler,
            reporter,
            shutdown,
        }
    }

    /// Number of executors.
    pub fn concurrency(&self) -> usize {
        self.config.concurrency.max(1)
    }

    /// Run the executors until shutdown is signalled.
    ///
    /// After the signal no new job is taken; in-flight jobs get up to the
    /// configured shutdown timeout to finish.
    pub async fn run(&self) {
        let workers = self.concurrency();
        info!("Starting worker pool with {} executors", workers);

        let mut set = JoinSet::new();
        for index in 0..workers {
            let queue = Arc::clone(&self.queue);
            let handler = Arc::clone(&self.handler);
            let reporter = Arc::clone(&self.reporter);
            let shutdown_rx = self.shutdown.subscribe();
            set.spawn(worker_loop(index, queue, handler, reporter, shutdown_rx));
        }

        let mut shutdown_rx = self.shutdown.subscribe();
        while !*shutdown_rx.borrow_and_update() {
            if shutdown_rx.changed().await.is_err() {
                break;
            }
        }

        info!("Waiting for in-flight jobs to complete...");
        let drained = tokio::time::timeout(self.config.shutdown_timeout, async {
            while let Some(res) = set.join_next().await {
                if let Err(e) = res {
                    error!("Executor task ended abnormally: {}", e);
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                "In-flight jobs did not finish within {:?}, aborting",
                self.config.shutdown_timeout
            );
            set.abort_all();
        }
        info!("Worker pool stopped");
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

async fn worker_loop(
    index: usize,
    queue: Arc<JobQueue>,
    handler: Arc<dyn JobHandler>,
    reporter: Arc<ResultReporter>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!(executor = index, "Executor started");

    loop {
        if *shutdown_rx.borrow_and_update() {
            break;
        }

        let job_id: JobId = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            next = queue.dequeue() => match next {
                Some(job_id) => job_id,
                None => break,
            },
        };

        match run_job(queue.registry(), handler.as_ref(), &job_id).await {
            Ok(job) => {
                reporter.report(&job);
            }
            Err(e) => {
                warn!(executor = index, job_id = %job_id, "Skipping job: {}", e);
            }
        }
    }

    debug!(executor = index, "Executor stopped");
}
