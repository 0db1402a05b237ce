//! Admission planner.
//!
//! Runs once, synchronously, before the worker pool starts. It reads the
//! presence index and never touches the backend.

use crate::scan::{TokenKind, scan};
use graphsweep_core::{Job, SchemaPresence, SkipReason};
use tracing::debug;

/// Decision for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Every referenced label and relationship type exists
    Runnable,
    /// The first reference the backend does not know
    Skip(SkipReason),
}

impl Admission {
    /// True when the job may be dispatched
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        matches!(self, Self::Runnable)
    }
}

/// Check one query against the presence index.
///
/// Tokens are checked in the order they appear in the text, so the reported
/// reason is reproducible for a given query and schema.
#[must_use]
pub fn admit(query: &str, presence: &SchemaPresence) -> Admission {
    for token in scan(query) {
        match token.kind {
            TokenKind::Label if !presence.has_label(&token.name) => {
                return Admission::Skip(SkipReason::MissingLabel(token.name));
            }
            TokenKind::RelationshipType if !presence.has_relationship_type(&token.name) => {
                return Admission::Skip(SkipReason::MissingRelationshipType(token.name));
            }
            _ => {}
        }
    }
    Admission::Runnable
}

/// Result of planning a job list
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Jobs to hand to the scheduler, in original order
    pub runnable: Vec<Job>,
    /// Jobs that will never be dispatched, keyed by original index
    pub skipped: Vec<(usize, SkipReason)>,
}

impl Plan {
    /// Total number of planned jobs
    #[must_use]
    pub fn len(&self) -> usize {
        self.runnable.len() + self.skipped.len()
    }

    /// True when there was nothing to plan
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runnable.is_empty() && self.skipped.is_empty()
    }
}

/// Splits a job list into runnable and skipped jobs
#[derive(Debug, Clone, Copy)]
pub struct Planner<'a> {
    presence: Option<&'a SchemaPresence>,
}

impl<'a> Planner<'a> {
    /// Planner that checks every job against `presence`
    #[must_use]
    pub fn new(presence: &'a SchemaPresence) -> Self {
        Self {
            presence: Some(presence),
        }
    }

    /// Planner that admits every job
    #[must_use]
    pub fn permissive() -> Self {
        Self { presence: None }
    }

    /// Plan a single job
    #[must_use]
    pub fn admit(&self, job: &Job) -> Admission {
        match self.presence {
            Some(presence) => admit(job.query(), presence),
            None => Admission::Runnable,
        }
    }

    /// Plan a whole job list
    #[must_use]
    pub fn plan(&self, jobs: &[Job]) -> Plan {
        let mut plan = Plan::default();
        for job in jobs {
            match self.admit(job) {
                Admission::Runnable => plan.runnable.push(job.clone()),
                Admission::Skip(reason) => {
                    debug!(index = job.index(), id = job.id(), %reason, "admission skip");
                    plan.skipped.push((job.index(), reason));
                }
            }
        }
        plan
    }
}
