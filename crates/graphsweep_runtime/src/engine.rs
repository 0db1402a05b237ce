//! Batch engine.
//!
//! Wires the pieces of one run together: schema inventory, admission,
//! dispatch over the worker pool, and aggregation. Per-job failures never
//! escape as errors; only a failure to start the run does.

use crate::aggregate::assemble;
use crate::backend::Backend;
use crate::monitor::{Metrics, RunMetrics};
use crate::retry::RetryPolicy;
use crate::scheduler::Scheduler;
use graphsweep_core::{
    BackendError, CoreError, ExecutionOptions, Job, JobOutcome, RunId, SchemaInventory,
    SchemaPresence, SkipReason,
};
use graphsweep_plan::Planner;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

/// Errors that prevent a run from starting
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Options or job list rejected before anything ran
    #[error("invalid run configuration: {0}")]
    InvalidOptions(#[from] CoreError),

    /// The schema inventory call failed
    #[error("schema inventory failed: {0}")]
    Inventory(#[source] BackendError),
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run identifier
    pub run_id: RunId,
    /// One outcome per original job, in job order
    pub outcomes: Vec<JobOutcome>,
    /// Inventory used for admission, if the check ran
    pub inventory: Option<SchemaInventory>,
    /// Counters collected during the run
    pub metrics: Metrics,
    /// Wall time of the run
    pub elapsed: Duration,
    /// True when the overall run deadline fired
    pub timed_out: bool,
}

impl RunReport {
    /// Number of jobs that succeeded
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of jobs that failed
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error().is_some()).count()
    }

    /// Number of jobs that never executed
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    /// Number of jobs skipped because the schema lacks something they use
    #[must_use]
    pub fn admission_skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.skip_reason().is_some_and(SkipReason::is_admission))
            .count()
    }
}

/// Runs job batches against one backend
pub struct BatchEngine {
    backend: Arc<dyn Backend>,
    options: ExecutionOptions,
    policy: RetryPolicy,
}

impl BatchEngine {
    /// Create an engine; the retry budget comes from `options`
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, options: ExecutionOptions) -> Self {
        let policy = RetryPolicy::new(options.retry_count);
        Self {
            backend,
            options,
            policy,
        }
    }

    /// Replace the retry policy, e.g. to change the backoff unit
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Options this engine runs with
    #[must_use]
    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Fetch the backend's schema inventory
    ///
    /// # Errors
    ///
    /// Returns error if the backend call fails
    pub async fn inventory(&self) -> Result<SchemaInventory, EngineError> {
        self.backend
            .inventory(&self.options.database)
            .await
            .map_err(EngineError::Inventory)
    }

    /// Run `jobs` with no external cancellation
    ///
    /// # Errors
    ///
    /// Returns error if the run cannot start
    pub async fn run(&self, jobs: &[Job]) -> Result<RunReport, EngineError> {
        self.run_until(jobs, CancellationToken::new()).await
    }

    /// Run `jobs`; cancelling `cancel` behaves like the run deadline firing.
    ///
    /// `jobs[i].index()` must equal `i`.
    ///
    /// # Errors
    ///
    /// Returns error if the options or job indices are invalid, or the
    /// schema inventory fails
    pub async fn run_until(
        &self,
        jobs: &[Job],
        cancel: CancellationToken,
    ) -> Result<RunReport, EngineError> {
        let options = self.options.clone().validated()?;
        check_indices(jobs)?;

        let run_id = RunId::new();
        let span = info_span!("run", run_id = %run_id);
        self.execute(run_id, jobs, options, cancel).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: RunId,
        jobs: &[Job],
        options: ExecutionOptions,
        cancel: CancellationToken,
    ) -> Result<RunReport, EngineError> {
        let started = Instant::now();
        let run = cancel.child_token();
        let watchdog = options.run_timeout.map(|limit| {
            let run = run.clone();
            tokio::spawn(async move {
                tokio::select! {
                    biased;
                    () = run.cancelled() => false,
                    () = tokio::time::sleep(limit) => {
                        warn!(limit_ms = limit.as_millis() as u64, "run deadline reached, cancelling");
                        run.cancel();
                        true
                    }
                }
            })
        });

        // a cancelled inventory falls through so every job reports the cancellation
        let inventory = if options.admission_check {
            let fetched = tokio::select! {
                biased;
                () = run.cancelled() => None,
                inv = self.inventory() => Some(inv),
            };
            match fetched {
                Some(Ok(inv)) => Some(inv),
                Some(Err(err)) => {
                    run.cancel();
                    return Err(err);
                }
                None => {
                    warn!("run cancelled before the schema inventory completed");
                    None
                }
            }
        } else {
            None
        };

        let presence = inventory.as_ref().map(SchemaPresence::from_inventory);
        let planner = match &presence {
            Some(presence) => Planner::new(presence),
            None => Planner::permissive(),
        };
        let plan = planner.plan(jobs);
        info!(
            labels = presence.as_ref().map_or(0, SchemaPresence::label_count),
            relationship_types = presence.as_ref().map_or(0, SchemaPresence::relationship_type_count),
            jobs = jobs.len(),
            runnable = plan.runnable.len(),
            skipped = plan.skipped.len(),
            "admission complete"
        );

        let metrics = Arc::new(RunMetrics::new());
        metrics.record_skips(plan.skipped.len() as u64);

        let scheduler = Scheduler::new(Arc::clone(&self.backend), options)
            .with_policy(self.policy)
            .with_metrics(Arc::clone(&metrics));
        let outcomes = scheduler.run(run_id, plan.runnable, run.clone()).await;

        // stops the watchdog if it has not fired yet
        run.cancel();
        let timed_out = match watchdog {
            Some(handle) => handle.await.unwrap_or(false),
            None => false,
        };

        let report = RunReport {
            run_id,
            outcomes: assemble(jobs, plan.skipped, outcomes),
            inventory,
            metrics: metrics.snapshot(),
            elapsed: started.elapsed(),
            timed_out,
        };
        info!(
            ok = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            admission_skipped = report.admission_skipped(),
            success_rate = report.metrics.success_rate(),
            failure_rate = report.metrics.failure_rate(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            timed_out,
            "run complete"
        );
        Ok(report)
    }
}

fn check_indices(jobs: &[Job]) -> Result<(), CoreError> {
    match jobs.iter().enumerate().find(|(pos, job)| job.index() != *pos) {
        Some((pos, job)) => Err(CoreError::Validation {
            field: "jobs".to_string(),
            reason: format!("job at position {} has index {}", pos, job.index()),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBackend, Step};
    use graphsweep_core::{JobError, OutcomeStatus, SkipReason};

    const HEADERS: &[&str] = &["user", "computer", "os"];

    fn inventory() -> SchemaInventory {
        SchemaInventory::new(
            vec!["User".to_string(), "Computer".to_string(), "Group".to_string()],
            vec!["MemberOf".to_string(), "AdminTo".to_string()],
        )
    }

    fn job(index: usize, query: &str) -> Job {
        Job::new(index, format!("q{}", index), format!("Query {}", index), query)
    }

    fn five_jobs() -> Vec<Job> {
        vec![
            job(0, "MATCH (u:User) RETURN u.name AS user, 'x' AS computer, 'y' AS os"),
            job(1, "MATCH (c:Computer) RETURN 1 AS user, c.name AS computer, c.os AS os"),
            job(2, "MATCH (u:User)-[:MemberOf]->(g:Group) RETURN 2"),
            job(3, "MATCH (u:User)-[:AdminTo]->(c:Computer) RETURN 3"),
            job(4, "MATCH (g:Group) RETURN 4"),
        ]
    }

    fn scripted(jobs: &[Job]) -> ScriptedBackend {
        jobs.iter().fold(ScriptedBackend::new(inventory()), |backend, job| {
            backend.with_script(
                job.query(),
                vec![Step::Return(ScriptedBackend::rows(HEADERS, 2)).after(Duration::from_millis(
                    10 * (5 - job.index() as u64),
                ))],
            )
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_all_succeed() {
        let jobs = five_jobs();
        let backend = scripted(&jobs);
        let options = ExecutionOptions::default()
            .with_parallelism(2)
            .with_retry_count(1)
            .with_per_job_timeout(None)
            .with_run_timeout(None);

        let report = BatchEngine::new(Arc::new(backend.clone()), options)
            .run(&jobs)
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 5);
        for (i, outcome) in report.outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert!(outcome.is_success());
            assert_eq!(outcome.result_set().columns(), HEADERS);
        }
        assert_eq!(report.succeeded(), 5);
        assert!(!report.timed_out);
        assert_eq!(backend.open_count(), 2);
        assert_eq!(backend.inventory_count(), 1);
        assert_eq!(report.metrics.jobs_dispatched, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_skip_never_dispatched() {
        let mut jobs = five_jobs();
        jobs[2] = job(2, "MATCH (u:AZUser)-[:MemberOf]->(g:Group) RETURN u");
        let backend = scripted(&jobs);

        let report = BatchEngine::new(Arc::new(backend.clone()), ExecutionOptions::default())
            .run(&jobs)
            .await
            .unwrap();

        assert_eq!(
            report.outcomes[2].skip_reason(),
            Some(&SkipReason::MissingLabel("AZUser".to_string()))
        );
        assert_eq!(backend.execute_count(jobs[2].query()), 0);
        assert_eq!(backend.total_executes(), 4);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.admission_skipped(), 1);
        assert_eq!(report.metrics.jobs_skipped, 1);
        assert!((report.metrics.success_rate() - 1.0).abs() < f64::EPSILON);
        assert_eq!(report.metrics.failure_rate(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_check_disabled() {
        let jobs = vec![job(0, "MATCH (n:Unknown) RETURN n")];
        let backend = ScriptedBackend::new(inventory());
        let options = ExecutionOptions::default().with_admission_check(false);

        let report = BatchEngine::new(Arc::new(backend.clone()), options)
            .run(&jobs)
            .await
            .unwrap();

        assert!(report.outcomes[0].is_success());
        assert!(report.inventory.is_none());
        assert_eq!(backend.inventory_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inventory_failure_aborts_before_dispatch() {
        let backend = ScriptedBackend::new(inventory())
            .with_inventory_error(BackendError::new("ServiceUnavailable"));
        let err = BatchEngine::new(Arc::new(backend.clone()), ExecutionOptions::default())
            .run(&five_jobs())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Inventory(_)));
        assert_eq!(backend.open_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_deadline_cancels_in_flight_and_pending() {
        let jobs = vec![
            job(0, "MATCH (u:User) RETURN u"),
            job(1, "MATCH (c:Computer) RETURN c"),
            job(2, "MATCH (g:Group) RETURN g"),
        ];
        let backend = ScriptedBackend::new(inventory())
            .with_fallback(Step::Return(ScriptedBackend::rows(&["n"], 1)).after(Duration::from_secs(30)));
        let options = ExecutionOptions::default()
            .with_parallelism(1)
            .with_per_job_timeout(None)
            .with_run_timeout(Some(Duration::from_secs(2)));

        let report = BatchEngine::new(Arc::new(backend.clone()), options)
            .run(&jobs)
            .await
            .unwrap();

        assert!(report.timed_out);
        assert!(matches!(report.outcomes[0].status, OutcomeStatus::Failed(JobError::Cancelled)));
        assert_eq!(report.outcomes[1].skip_reason(), Some(&SkipReason::RunCancelled));
        assert_eq!(report.outcomes[2].skip_reason(), Some(&SkipReason::RunCancelled));
        assert!(report.elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_cancel_before_start() {
        for admission_check in [true, false] {
            let backend = ScriptedBackend::new(inventory());
            let token = CancellationToken::new();
            token.cancel();
            let options = ExecutionOptions::default().with_admission_check(admission_check);
            let report = BatchEngine::new(Arc::new(backend.clone()), options)
                .run_until(&five_jobs(), token)
                .await
                .unwrap();

            assert_eq!(report.outcomes.len(), 5);
            assert_eq!(report.admission_skipped(), 0);
            assert!(
                report
                    .outcomes
                    .iter()
                    .all(|o| o.skip_reason() == Some(&SkipReason::RunCancelled))
            );
            assert!(report.inventory.is_none());
            assert_eq!(backend.total_executes(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_deadline_during_inventory() {
        let backend = ScriptedBackend::new(inventory()).with_inventory_delay(Duration::from_secs(30));
        let options = ExecutionOptions::default().with_run_timeout(Some(Duration::from_secs(1)));

        let report = BatchEngine::new(Arc::new(backend.clone()), options)
            .run(&five_jobs())
            .await
            .unwrap();

        assert!(report.timed_out);
        assert_eq!(report.skipped(), 5);
        assert_eq!(report.outcomes[4].skip_reason(), Some(&SkipReason::RunCancelled));
        assert_eq!(backend.inventory_count(), 1);
        assert_eq!(backend.total_executes(), 0);
    }

    #[tokio::test]
    async fn test_rejects_sparse_indices() {
        let backend = ScriptedBackend::new(inventory());
        let jobs = vec![job(0, "RETURN 0"), job(2, "RETURN 2")];
        let err = BatchEngine::new(Arc::new(backend), ExecutionOptions::default())
            .run(&jobs)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("position 1 has index 2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried_through_engine() {
        let jobs = vec![job(0, "MATCH (u:User) RETURN u")];
        let backend = ScriptedBackend::new(inventory()).with_script(
            jobs[0].query(),
            vec![
                Step::Fail(BackendError::new("db unavailable").with_code("Neo.TransientError.General.DatabaseUnavailable")),
                Step::Return(ScriptedBackend::rows(&["u"], 1)),
            ],
        );
        let report = BatchEngine::new(Arc::new(backend.clone()), ExecutionOptions::default())
            .run(&jobs)
            .await
            .unwrap();
        assert!(report.outcomes[0].is_success());
        assert_eq!(report.metrics.attempts, 2);
        assert_eq!(report.metrics.retries, 1);
    }
}
