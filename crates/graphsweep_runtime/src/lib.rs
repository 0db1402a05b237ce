//! graphsweep runtime
//!
//! Runs a fixed batch of independent read-only query jobs under bounded
//! parallelism:
//! - Jobs are admitted against the schema before dispatch
//! - A fixed pool of workers pulls jobs from one shared queue
//! - Transient backend failures are retried with linear backoff
//! - Per-job deadlines, an overall run deadline and fail-fast stop
//! - Outcomes come back in input order regardless of completion order

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod backend;
pub mod cancel;
pub mod classify;
pub mod engine;
pub mod monitor;
pub mod retry;
pub mod scheduler;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use aggregate::assemble;
pub use backend::{Backend, ExecuteRequest, Session};
pub use cancel::CancelScope;
pub use classify::{TRANSIENT_MESSAGE_MARKERS, Transience, classify};
pub use engine::{BatchEngine, EngineError, RunReport};
pub use monitor::{Metrics, RunMetrics};
pub use retry::{DEFAULT_BASE_DELAY, RetryPolicy};
pub use scheduler::Scheduler;

// The cancellation token type is part of the public API
pub use tokio_util::sync::CancellationToken;
