//! Run metrics.
//!
//! Counters are updated concurrently by workers and read once the run is
//! over through a plain [`Metrics`] snapshot.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the counters of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    /// Backend sessions opened by workers
    pub sessions_opened: u64,
    /// Jobs pulled from the queue by a worker
    pub jobs_dispatched: u64,
    /// Backend execute calls, retries included
    pub attempts: u64,
    /// Attempts that followed a transient failure
    pub retries: u64,
    /// Jobs that succeeded
    pub jobs_succeeded: u64,
    /// Jobs that failed, timeouts included
    pub jobs_failed: u64,
    /// Jobs that hit their own deadline
    pub jobs_timed_out: u64,
    /// Jobs that never executed
    pub jobs_skipped: u64,
}

impl Metrics {
    /// Fraction of dispatched jobs that succeeded (0.0 - 1.0)
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.jobs_dispatched == 0 {
            return 1.0;
        }
        self.jobs_succeeded as f64 / self.jobs_dispatched as f64
    }

    /// Fraction of dispatched jobs that failed (0.0 - 1.0)
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        if self.jobs_dispatched == 0 {
            return 0.0;
        }
        self.jobs_failed as f64 / self.jobs_dispatched as f64
    }
}

/// Shared live counters
#[derive(Debug, Default)]
pub struct RunMetrics {
    sessions_opened: AtomicU64,
    jobs_dispatched: AtomicU64,
    attempts: AtomicU64,
    retries: AtomicU64,
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_timed_out: AtomicU64,
    jobs_skipped: AtomicU64,
}

impl RunMetrics {
    /// Create zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session open
    pub fn record_session(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job leaving the queue
    pub fn record_dispatch(&self) {
        self.jobs_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one execute call
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a retry after a transient failure
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful job
    pub fn record_success(&self) {
        self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed job
    pub fn record_failure(&self, timed_out: bool) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.jobs_timed_out.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record `count` jobs that never executed
    pub fn record_skips(&self, count: u64) {
        self.jobs_skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Take a snapshot
    #[must_use]
    pub fn snapshot(&self) -> Metrics {
        Metrics {
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            jobs_dispatched: self.jobs_dispatched.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_timed_out: self.jobs_timed_out.load(Ordering::Relaxed),
            jobs_skipped: self.jobs_skipped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = RunMetrics::new().snapshot();
        assert_eq!(metrics, Metrics::default());
        assert_eq!(metrics.success_rate(), 1.0);
        assert_eq!(metrics.failure_rate(), 0.0);
    }

    #[test]
    fn test_metrics_record() {
        let live = RunMetrics::new();
        for _ in 0..4 {
            live.record_dispatch();
        }
        live.record_success();
        live.record_success();
        live.record_success();
        live.record_failure(true);
        live.record_skips(2);

        let metrics = live.snapshot();
        assert_eq!(metrics.jobs_dispatched, 4);
        assert_eq!(metrics.jobs_timed_out, 1);
        assert_eq!(metrics.jobs_skipped, 2);
        assert_eq!(metrics.success_rate(), 0.75);
        assert_eq!(metrics.failure_rate(), 0.25);
    }
}
