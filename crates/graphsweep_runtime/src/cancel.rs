//! Cancellation scopes.
//!
//! A scope combines the run-level token, which affects every job, with an
//! optional per-job deadline, which affects only the job that owns the
//! scope. Every suspension point of a job goes through [`CancelScope::run`].

use graphsweep_core::JobError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    limit: Duration,
}

/// Cancellation context for one job
#[derive(Debug, Clone)]
pub struct CancelScope {
    run: CancellationToken,
    deadline: Option<Deadline>,
}

impl CancelScope {
    /// Scope bound only to the run token
    #[must_use]
    pub fn new(run: CancellationToken) -> Self {
        Self {
            run,
            deadline: None,
        }
    }

    /// Start the per-job clock now; `None` leaves the job without a deadline
    #[must_use]
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.deadline = limit.map(|limit| Deadline {
            at: Instant::now() + limit,
            limit,
        });
        self
    }

    /// The per-job deadline, if any
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.map(|d| d.at)
    }

    /// Fail immediately if the scope is already cancelled.
    ///
    /// Run cancellation takes precedence over the job's own deadline.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Cancelled`] or [`JobError::Timeout`]
    pub fn check(&self) -> Result<(), JobError> {
        if self.run.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d.at => Err(JobError::Timeout { after: d.limit }),
            _ => Ok(()),
        }
    }

    /// Resolve once the run is cancelled or the deadline passes
    pub async fn cancelled(&self) -> JobError {
        match self.deadline {
            Some(d) => tokio::select! {
                biased;
                () = self.run.cancelled() => JobError::Cancelled,
                () = tokio::time::sleep_until(d.at) => JobError::Timeout { after: d.limit },
            },
            None => {
                self.run.cancelled().await;
                JobError::Cancelled
            }
        }
    }

    /// Drive `fut` until it completes or the scope is cancelled
    ///
    /// # Errors
    ///
    /// Returns the cancellation error if the scope fires first
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, JobError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            err = self.cancelled() => Err(err),
            out = fut => Ok(out),
        }
    }
}
