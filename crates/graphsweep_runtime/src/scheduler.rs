//! Bounded worker pool.
//!
//! A single producer feeds runnable jobs into one bounded queue; a fixed
//! number of workers drain it. Each worker owns one backend session for its
//! whole lifetime. Outcomes land in a pre-sized slot array indexed by queue
//! position, so completion order never affects output order.
//!
//! Three cancellation signals reach a job:
//! - the run token, which aborts in-flight and pending work
//! - the per-job deadline, which aborts only that job
//! - the fail-fast stop, which only keeps undispatched jobs off the queue

use crate::backend::{Backend, ExecuteRequest, Session};
use crate::cancel::CancelScope;
use crate::monitor::RunMetrics;
use crate::retry::RetryPolicy;
use graphsweep_core::{
    BackendError, ExecutionOptions, Job, JobError, JobOutcome, RunId, SkipReason,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

type Queue = Arc<Mutex<mpsc::Receiver<(usize, Job)>>>;

/// State shared by the producer and every worker of one run
struct Pool {
    run_id: RunId,
    backend: Arc<dyn Backend>,
    options: ExecutionOptions,
    policy: RetryPolicy,
    total: usize,
    run: CancellationToken,
    stop: CancellationToken,
    fail_fast_tripped: AtomicBool,
    slots: Box<[OnceCell<JobOutcome>]>,
    dispatched: Box<[AtomicBool]>,
    metrics: Arc<RunMetrics>,
}

/// Dispatches runnable jobs over a fixed set of workers
pub struct Scheduler {
    backend: Arc<dyn Backend>,
    options: ExecutionOptions,
    policy: RetryPolicy,
    metrics: Arc<RunMetrics>,
}

impl Scheduler {
    /// Create a scheduler; the retry budget comes from `options`
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, options: ExecutionOptions) -> Self {
        let policy = RetryPolicy::new(options.retry_count);
        Self {
            backend,
            options,
            policy,
            metrics: Arc::new(RunMetrics::new()),
        }
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Share a metrics sink with the caller
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<RunMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Live counters of this scheduler
    #[must_use]
    pub fn metrics(&self) -> &Arc<RunMetrics> {
        &self.metrics
    }

    /// Run `jobs` to completion.
    ///
    /// Returns one outcome per job, in the order of `jobs`, each tagged with
    /// its job's original index. Returns only after every worker has exited.
    /// Jobs that were never pulled from the queue come back skipped.
    pub async fn run(&self, run_id: RunId, jobs: Vec<Job>, run: CancellationToken) -> Vec<JobOutcome> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let workers = self.options.worker_count().min(jobs.len());
        let indices: Vec<usize> = jobs.iter().map(Job::index).collect();
        let pool = Arc::new(Pool {
            run_id,
            backend: Arc::clone(&self.backend),
            options: self.options.clone(),
            policy: self.policy,
            total: jobs.len(),
            stop: run.child_token(),
            run,
            fail_fast_tripped: AtomicBool::new(false),
            slots: (0..jobs.len()).map(|_| OnceCell::new()).collect(),
            dispatched: (0..jobs.len()).map(|_| AtomicBool::new(false)).collect(),
            metrics: Arc::clone(&self.metrics),
        });

        info!(run_id = %run_id, jobs = jobs.len(), workers, "dispatching jobs");

        let (tx, rx) = mpsc::channel(1);
        let queue: Queue = Arc::new(Mutex::new(rx));

        let producer = tokio::spawn(produce(jobs, tx, pool.stop.clone()));
        let handles: Vec<_> = (0..workers)
            .map(|worker| tokio::spawn(work(worker, Arc::clone(&pool), Arc::clone(&queue))))
            .collect();

        for joined in futures::future::join_all(handles).await {
            if let Err(err) = joined {
                error!(error = %err, "worker task ended abnormally");
            }
        }
        if let Err(err) = producer.await {
            error!(error = %err, "producer task ended abnormally");
        }

        collect(&pool, &indices)
    }
}

async fn produce(jobs: Vec<Job>, tx: mpsc::Sender<(usize, Job)>, stop: CancellationToken) {
    for (pos, job) in jobs.into_iter().enumerate() {
        tokio::select! {
            biased;
            () = stop.cancelled() => {
                debug!(pos, "dispatch stopped");
                return;
            }
            sent = tx.send((pos, job)) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

async fn next_job(queue: &Queue, stop: &CancellationToken) -> Option<(usize, Job)> {
    let mut rx = queue.lock().await;
    tokio::select! {
        biased;
        () = stop.cancelled() => None,
        next = rx.recv() => next,
    }
}

async fn work(worker: usize, pool: Arc<Pool>, queue: Queue) {
    let mut session = match pool.backend.open(&pool.options.database).await {
        Ok(session) => {
            pool.metrics.record_session();
            Ok(session)
        }
        Err(err) => {
            warn!(worker, error = %err, "could not open session");
            Err(err)
        }
    };

    while let Some((pos, job)) = next_job(&queue, &pool.stop).await {
        pool.dispatched[pos].store(true, Ordering::SeqCst);
        pool.metrics.record_dispatch();

        let span = info_span!(
            "job",
            run_id = %pool.run_id,
            index = job.index(),
            id = job.id(),
            worker
        );
        let outcome = match session.as_mut() {
            Ok(session) => execute(&pool, session.as_mut(), &job).instrument(span).await,
            Err(err) => JobOutcome::failed(job.index(), JobError::Backend(BackendError::clone(err))),
        };
        record(&pool, pos, outcome);
    }
}

async fn execute(pool: &Pool, session: &mut dyn Session, job: &Job) -> JobOutcome {
    info!(
        "[{}/{}] {}",
        job.index() + 1,
        pool.total,
        job.display_name()
    );

    let scope = CancelScope::new(pool.run.clone()).with_timeout(pool.options.per_job_timeout);
    let request = ExecuteRequest::new(job.query())
        .with_row_limit(pool.options.row_limit)
        .with_deadline(scope.deadline());

    match pool.policy.execute(session, &request, &scope, &pool.metrics).await {
        Ok(mut rs) => {
            rs.truncate(pool.options.row_limit);
            JobOutcome::succeeded(job.index(), rs)
        }
        Err(err) => {
            if err.is_timeout() {
                warn!(error = %err, "query timed out");
            } else {
                warn!(error = %err, "query failed");
            }
            JobOutcome::failed(job.index(), err)
        }
    }
}

fn record(pool: &Pool, pos: usize, outcome: JobOutcome) {
    match outcome.error() {
        None => pool.metrics.record_success(),
        Some(err) => {
            pool.metrics.record_failure(err.is_timeout());
            if pool.options.fail_fast && !pool.fail_fast_tripped.swap(true, Ordering::SeqCst) {
                info!(index = outcome.index, "fail-fast: stopping dispatch");
                pool.stop.cancel();
            }
        }
    }
    if pool.slots[pos].set(outcome).is_err() {
        error!(pos, "outcome slot written twice");
    }
}

/// Drain the slot array, filling jobs that never produced an outcome
fn collect(pool: &Pool, indices: &[usize]) -> Vec<JobOutcome> {
    let not_dispatched = if pool.fail_fast_tripped.load(Ordering::SeqCst) {
        SkipReason::FailFast
    } else {
        SkipReason::RunCancelled
    };

    let mut skipped = 0u64;
    let outcomes = indices
        .iter()
        .enumerate()
        .map(|(pos, &index)| match pool.slots[pos].get() {
            Some(outcome) => outcome.clone(),
            None if pool.dispatched[pos].load(Ordering::SeqCst) => JobOutcome::failed(
                index,
                JobError::Internal {
                    message: "worker exited before recording an outcome".to_string(),
                },
            ),
            None => {
                skipped += 1;
                JobOutcome::skipped(index, not_dispatched.clone())
            }
        })
        .collect();

    pool.metrics.record_skips(skipped);
    if skipped > 0 {
        info!(skipped, reason = %not_dispatched, "jobs not dispatched");
    }
    outcomes
}
