//! Result aggregation.
//!
//! Merges planner skips and scheduler outcomes into one collection with
//! exactly one entry per original job, at the job's own position.

use graphsweep_core::{Job, JobError, JobOutcome, SkipReason};
use tracing::error;

/// Build the final, index-ordered outcome list.
///
/// `jobs` is the original list; `skipped` holds the planner's decisions and
/// `outcomes` whatever the scheduler produced. A position left without any
/// entry is reported as an internal error rather than dropped.
#[must_use]
pub fn assemble(
    jobs: &[Job],
    skipped: Vec<(usize, SkipReason)>,
    outcomes: Vec<JobOutcome>,
) -> Vec<JobOutcome> {
    let mut slots: Vec<Option<JobOutcome>> = vec![None; jobs.len()];

    let planned = skipped
        .into_iter()
        .map(|(index, reason)| JobOutcome::skipped(index, reason));

    for outcome in planned.chain(outcomes) {
        let index = outcome.index;
        match slots.get_mut(index) {
            Some(slot) if slot.is_none() => *slot = Some(outcome),
            Some(_) => error!(index, "duplicate outcome ignored"),
            None => error!(index, total = jobs.len(), "outcome index out of range"),
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                JobOutcome::failed(
                    index,
                    JobError::Internal {
                        message: "no outcome recorded".to_string(),
                    },
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphsweep_core::ResultSet;

    fn jobs(n: usize) -> Vec<Job> {
        (0..n).map(|i| Job::new(i, i.to_string(), i.to_string(), "RETURN 1")).collect()
    }

    #[test]
    fn test_merges_skips_and_outcomes() {
        let out = assemble(
            &jobs(4),
            vec![(1, SkipReason::MissingLabel("AZUser".to_string()))],
            vec![
                JobOutcome::succeeded(3, ResultSet::default()),
                JobOutcome::succeeded(0, ResultSet::default()),
                JobOutcome::skipped(2, SkipReason::FailFast),
            ],
        );
        assert_eq!(out.len(), 4);
        for (i, outcome) in out.iter().enumerate() {
            assert_eq!(outcome.index, i);
        }
        assert_eq!(out[1].skip_reason().unwrap().to_string(), "missing label: AZUser");
        assert_eq!(out[2].skip_reason(), Some(&SkipReason::FailFast));
        assert!(out[3].is_success());
    }

    #[test]
    fn test_missing_outcome_becomes_internal_error() {
        let out = assemble(&jobs(2), Vec::new(), vec![JobOutcome::succeeded(0, ResultSet::default())]);
        assert!(matches!(out[1].error(), Some(JobError::Internal { .. })));
    }

    #[test]
    fn test_duplicates_and_out_of_range_ignored() {
        let out = assemble(
            &jobs(1),
            vec![(0, SkipReason::RunCancelled)],
            vec![
                JobOutcome::succeeded(0, ResultSet::default()),
                JobOutcome::succeeded(7, ResultSet::default()),
            ],
        );
        assert_eq!(out.len(), 1);
        assert!(out[0].is_skipped());
    }

    #[test]
    fn test_empty() {
        assert!(assemble(&[], Vec::new(), Vec::new()).is_empty());
    }
}
