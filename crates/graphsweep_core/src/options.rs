//! Execution options for one batch run.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of parallel workers
pub const DEFAULT_PARALLELISM: usize = 4;

/// Default per-job deadline
pub const DEFAULT_PER_JOB_TIMEOUT: Duration = Duration::from_secs(30);

/// Default overall run deadline
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(60);

/// Options supplied once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Database every worker opens its handle against
    pub database: String,
    /// Maximum rows per job (0 = unlimited)
    pub row_limit: usize,
    /// Number of workers
    pub parallelism: usize,
    /// Deadline for a single job, covering all of its retry attempts
    pub per_job_timeout: Option<Duration>,
    /// Additional attempts after a transient failure
    pub retry_count: u32,
    /// Stop dispatching new jobs after the first failure
    pub fail_fast: bool,
    /// Deadline for the whole run
    pub run_timeout: Option<Duration>,
    /// Skip jobs that reference labels or relationship types the backend lacks
    pub admission_check: bool,
}

impl ExecutionOptions {
    /// Create options for `database` with defaults everywhere else
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    /// Set the row limit
    #[must_use]
    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.row_limit = limit;
        self
    }

    /// Set the number of workers
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Set or clear the per-job deadline
    #[must_use]
    pub fn with_per_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.per_job_timeout = timeout;
        self
    }

    /// Set the retry budget
    #[must_use]
    pub fn with_retry_count(mut self, retries: u32) -> Self {
        self.retry_count = retries;
        self
    }

    /// Enable or disable fail-fast
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set or clear the overall run deadline
    #[must_use]
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Enable or disable the schema admission check
    #[must_use]
    pub fn with_admission_check(mut self, enabled: bool) -> Self {
        self.admission_check = enabled;
        self
    }

    /// Number of workers to start, never less than one
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.parallelism.max(1)
    }

    /// Check the options and coerce parallelism to at least one
    ///
    /// # Errors
    ///
    /// Returns error if the database name is blank or a timeout is zero
    pub fn validated(mut self) -> CoreResult<Self> {
        if self.database.trim().is_empty() {
            return Err(CoreError::InvalidOption {
                field: "database".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.per_job_timeout == Some(Duration::ZERO) {
            return Err(CoreError::InvalidOption {
                field: "per_job_timeout".to_string(),
                reason: "use None to disable the per-job deadline".to_string(),
            });
        }
        if self.run_timeout == Some(Duration::ZERO) {
            return Err(CoreError::InvalidOption {
                field: "run_timeout".to_string(),
                reason: "use None to disable the run deadline".to_string(),
            });
        }
        self.parallelism = self.worker_count();
        Ok(self)
    }
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            database: "neo4j".to_string(),
            row_limit: 0,
            parallelism: DEFAULT_PARALLELISM,
            per_job_timeout: Some(DEFAULT_PER_JOB_TIMEOUT),
            retry_count: 1,
            fail_fast: false,
            run_timeout: Some(DEFAULT_RUN_TIMEOUT),
            admission_check: true,
        }
    }
}
