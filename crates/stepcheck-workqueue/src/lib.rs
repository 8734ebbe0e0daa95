//! # stepcheck Queue
//!
//! Evaluation queue for one module.
//!
//! ## Features
//!
//! - Serial FIFO evaluation against a single browser session
//! - Background fixes polled without blocking the queue
//! - Durable passed-set loaded from the previous run's results
//! - Bounded retries per component
//! - Backup-then-overwrite fix application with restore on failure

pub mod error;
pub mod fixes;
pub mod queue;
pub mod report;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod task;

#[cfg(test)]
mod testing;

pub use error::QueueError;
pub use fixes::{FinishedFix, FixOutcome, FixRecord, FixTracker};
pub use queue::EvaluationQueue;
pub use report::EvaluationReport;
pub use scheduler::{RunContext, Scheduler};
pub use source::{ApplyOutcome, FileSourceStore, SourceStore};
pub use store::{FileResultStore, MemoryResultStore, ResultStore};
pub use task::{ComponentTask, TaskStatus};
