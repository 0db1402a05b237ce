//! Query/outcome pairs.

use crate::error::{ReportError, ReportResult};
use crate::format::format_value;
use graphsweep_catalog::QueryDef;
use graphsweep_core::{JobOutcome, OutcomeStatus};
use serde::Serialize;
use std::fmt;

/// Report status of one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Succeeded with at least one row
    Ok,
    /// Succeeded with no rows
    Empty,
    /// Never executed
    Skipped,
    /// Failed
    Error,
}

impl EntryStatus {
    /// Lowercase label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Empty => "empty",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog query next to what happened when it ran
#[derive(Debug, Clone, Copy)]
pub struct ReportEntry<'a> {
    /// Catalog definition
    pub query: &'a QueryDef,
    /// Outcome at the same position
    pub outcome: &'a JobOutcome,
}

impl<'a> ReportEntry<'a> {
    /// Status for summaries and structured output
    #[must_use]
    pub fn status(&self) -> EntryStatus {
        match &self.outcome.status {
            OutcomeStatus::Skipped(_) => EntryStatus::Skipped,
            OutcomeStatus::Failed(_) => EntryStatus::Error,
            OutcomeStatus::Succeeded(rs) if rs.is_empty() => EntryStatus::Empty,
            OutcomeStatus::Succeeded(_) => EntryStatus::Ok,
        }
    }

    /// Rows rendered as display strings.
    ///
    /// Values follow the query's declared column keys; a key the result does
    /// not carry renders empty. Queries without declared headers fall back to
    /// the result's own columns.
    #[must_use]
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        let rs = self.outcome.result_set();
        let keys = self.query.column_keys();
        if keys.is_empty() {
            return rs
                .rows()
                .iter()
                .map(|row| {
                    rs.columns()
                        .iter()
                        .zip(row)
                        .map(|(column, value)| format_value(column, value))
                        .collect()
                })
                .collect();
        }

        let index = rs.column_index();
        rs.rows()
            .iter()
            .map(|row| {
                keys.iter()
                    .map(|key| {
                        index
                            .get(key.as_str())
                            .and_then(|&i| row.get(i))
                            .map(|value| format_value(key, value))
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }
}

/// Pair each query with the outcome at the same position
///
/// # Errors
///
/// Returns error if the two lists differ in length
pub fn entries<'a>(
    queries: &'a [QueryDef],
    outcomes: &'a [JobOutcome],
) -> ReportResult<Vec<ReportEntry<'a>>> {
    if queries.len() != outcomes.len() {
        return Err(ReportError::Mismatch {
            queries: queries.len(),
            outcomes: outcomes.len(),
        });
    }
    Ok(queries
        .iter()
        .zip(outcomes)
        .map(|(query, outcome)| ReportEntry { query, outcome })
        .collect())
}
