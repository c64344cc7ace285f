//! In-memory job registry and bounded FIFO queue.
//!
//! This crate provides:
//! - `JobRegistry`: authoritative job state keyed by id
//! - `JobQueue`: bounded FIFO with non-blocking backpressure
//! - `RetentionSweeper`: eviction of expired terminal jobs

pub mod error;
pub mod queue;
pub mod registry;
pub mod sweeper;

pub use error::{QueueError, QueueResult};
pub use queue::{JobQueue, QueueConfig, QUEUE_DEPTH_GAUGE};
pub use registry::{JobCounts, JobRegistry};
pub use sweeper::RetentionSweeper;
