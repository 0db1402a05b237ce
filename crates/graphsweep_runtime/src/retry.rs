//! Retry and backoff policy.

use crate::backend::{ExecuteRequest, Session};
use crate::cancel::CancelScope;
use crate::classify::classify;
use crate::monitor::RunMetrics;
use graphsweep_core::{JobError, ResultSet};
use std::time::Duration;
use tracing::{debug, warn};

/// Default delay unit for linear backoff
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);

/// Bounded retries on transient failures.
///
/// The n-th retry waits `base_delay * n` before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub retries: u32,
    /// Delay unit for linear backoff
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Policy with `retries` extra attempts and the default delay
    #[must_use]
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    /// Set the backoff delay unit
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Maximum number of execute calls for one job
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay before the given retry (1-based)
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry)
    }

    /// Execute `request` on `session` until it succeeds, fails permanently,
    /// exhausts the retry budget, or `scope` fires.
    ///
    /// Backoff sleeps are interruptible; no sleep follows the final attempt.
    ///
    /// # Errors
    ///
    /// Returns the last backend error, or the scope's cancellation error
    pub async fn execute(
        &self,
        session: &mut dyn Session,
        request: &ExecuteRequest,
        scope: &CancelScope,
        metrics: &RunMetrics,
    ) -> Result<ResultSet, JobError> {
        let mut attempt: u32 = 0;
        loop {
            scope.check()?;
            attempt += 1;
            metrics.record_attempt();

            let err = match scope.run(session.execute(request)).await? {
                Ok(rs) => {
                    debug!(attempt, rows = rs.len(), "query succeeded");
                    return Ok(rs);
                }
                Err(err) => err,
            };

            // a failure observed after the scope fired is reported as the cancellation
            scope.check()?;

            if !classify(&err).is_transient() {
                debug!(attempt, error = %err, "permanent failure");
                return Err(err.into());
            }
            if attempt >= self.max_attempts() {
                warn!(attempt, error = %err, "transient failure, retries exhausted");
                return Err(err.into());
            }

            let delay = self.delay_for(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure, retrying"
            );
            scope.run(tokio::time::sleep(delay)).await?;
            metrics.record_retry();
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::testing::{ScriptedBackend, Step};
    use graphsweep_core::{BackendError, SchemaInventory};
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    const QUERY: &str = "MATCH (u:User) RETURN u.name AS user";

    fn transient() -> Step {
        Step::Fail(BackendError::new("connection reset by peer"))
    }

    fn ok_rows() -> Step {
        Step::Return(ScriptedBackend::rows(&["user"], 1))
    }

    async fn run_script(steps: Vec<Step>, retries: u32) -> (Result<ResultSet, JobError>, ScriptedBackend) {
        let backend = ScriptedBackend::new(SchemaInventory::default()).with_script(QUERY, steps);
        let mut session = backend.open("neo4j").await.unwrap();
        let scope = CancelScope::new(CancellationToken::new());
        let out = RetryPolicy::new(retries)
            .execute(session.as_mut(), &ExecuteRequest::new(QUERY), &scope, &RunMetrics::new())
            .await;
        (out, backend)
    }

    #[test]
    fn test_delays_are_linear() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_within_budget() {
        let start = Instant::now();
        let (out, backend) = run_script(vec![transient(), transient(), ok_rows()], 2).await;
        assert!(out.is_ok());
        assert_eq!(backend.execute_count(QUERY), 3);
        // 200ms + 400ms of backoff
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(600));
        assert!(elapsed < Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_when_exhausted() {
        let steps = vec![
            transient(),
            Step::Fail(BackendError::new("broken pipe")),
            ok_rows(),
        ];
        let (out, backend) = run_script(steps, 1).await;
        assert_eq!(out.unwrap_err().to_string(), "broken pipe");
        assert_eq!(backend.execute_count(QUERY), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_single_attempt() {
        let steps = vec![
            Step::Fail(BackendError::new("Invalid input").with_code("Neo.ClientError.Statement.SyntaxError")),
            ok_rows(),
        ];
        let (out, backend) = run_script(steps, 5).await;
        assert!(out.unwrap_err().as_backend().is_some());
        assert_eq!(backend.execute_count(QUERY), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries() {
        let (out, backend) = run_script(vec![transient(), ok_rows()], 0).await;
        assert!(out.is_err());
        assert_eq!(backend.execute_count(QUERY), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_interrupted_by_deadline() {
        let backend = ScriptedBackend::new(SchemaInventory::default())
            .with_script(QUERY, vec![transient(), ok_rows()]);
        let mut session = backend.open("neo4j").await.unwrap();
        let scope = CancelScope::new(CancellationToken::new())
            .with_timeout(Some(Duration::from_millis(50)));
        let policy = RetryPolicy::new(3).with_base_delay(Duration::from_secs(10));

        let start = Instant::now();
        let out = policy
            .execute(session.as_mut(), &ExecuteRequest::new(QUERY), &scope, &RunMetrics::new())
            .await;
        assert!(out.unwrap_err().is_timeout());
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(backend.execute_count(QUERY), 1);
    }
}
