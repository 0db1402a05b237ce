//! Per-job outcomes.

use crate::failure::JobError;
use crate::job::ResultSet;
use std::fmt;

static EMPTY_RESULT: ResultSet = ResultSet::EMPTY;

/// Why a job was never executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The query references a node label the backend does not have
    MissingLabel(String),
    /// The query references a relationship type the backend does not have
    MissingRelationshipType(String),
    /// Fail-fast stopped dispatch before this job was pulled
    FailFast,
    /// The run was cancelled before this job was pulled
    RunCancelled,
}

impl SkipReason {
    /// True for schema-based admission skips
    #[must_use]
    pub fn is_admission(&self) -> bool {
        matches!(self, Self::MissingLabel(_) | Self::MissingRelationshipType(_))
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLabel(label) => write!(f, "missing label: {}", label),
            Self::MissingRelationshipType(rel) => write!(f, "missing relationship type: {}", rel),
            Self::FailFast => write!(f, "not dispatched: fail-fast stop after an earlier failure"),
            Self::RunCancelled => write!(f, "not dispatched: run cancelled"),
        }
    }
}

/// Terminal state of one job
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeStatus {
    /// Executed and returned a result set
    Succeeded(ResultSet),
    /// Executed and failed after its attempt sequence
    Failed(JobError),
    /// Never executed
    Skipped(SkipReason),
}

/// The outcome of the job at `index`.
///
/// A run produces exactly one of these per original job, stored at the
/// job's own position.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    /// Position of the job in the original list
    pub index: usize,
    /// What happened
    pub status: OutcomeStatus,
}

impl JobOutcome {
    /// Successful outcome
    #[must_use]
    pub fn succeeded(index: usize, result: ResultSet) -> Self {
        Self {
            index,
            status: OutcomeStatus::Succeeded(result),
        }
    }

    /// Failed outcome
    #[must_use]
    pub fn failed(index: usize, error: JobError) -> Self {
        Self {
            index,
            status: OutcomeStatus::Failed(error),
        }
    }

    /// Skipped outcome
    #[must_use]
    pub fn skipped(index: usize, reason: SkipReason) -> Self {
        Self {
            index,
            status: OutcomeStatus::Skipped(reason),
        }
    }

    /// Rows returned; empty unless the job succeeded
    #[must_use]
    pub fn result_set(&self) -> &ResultSet {
        match &self.status {
            OutcomeStatus::Succeeded(rs) => rs,
            _ => &EMPTY_RESULT,
        }
    }

    /// The terminal error, if the job failed
    #[must_use]
    pub fn error(&self) -> Option<&JobError> {
        match &self.status {
            OutcomeStatus::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Rendered error message, if the job failed
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    /// True when the job never executed
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, OutcomeStatus::Skipped(_))
    }

    /// Why the job was skipped
    #[must_use]
    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.status {
            OutcomeStatus::Skipped(reason) => Some(reason),
            _ => None,
        }
    }

    /// True when the job executed and succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded(_))
    }
}
