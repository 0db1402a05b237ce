//! JSON renderer.

use crate::entry::{EntryStatus, ReportEntry};
use crate::error::ReportResult;
use graphsweep_catalog::QueryDef;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

#[derive(Serialize)]
struct JsonEntry<'a> {
    query: &'a QueryDef,
    status: EntryStatus,
    columns: &'a [String],
    rows: &'a [Vec<Value>],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_reason: Option<String>,
}

impl<'a> From<&ReportEntry<'a>> for JsonEntry<'a> {
    fn from(entry: &ReportEntry<'a>) -> Self {
        let rs = entry.outcome.result_set();
        Self {
            query: entry.query,
            status: entry.status(),
            columns: rs.columns(),
            rows: rs.rows(),
            error: entry.outcome.error_message(),
            skipped: entry.outcome.is_skipped(),
            skip_reason: entry.outcome.skip_reason().map(ToString::to_string),
        }
    }
}

/// Write all entries as a pretty-printed JSON array
///
/// # Errors
///
/// Returns error if encoding or writing fails
pub fn write_json<W: Write>(out: &mut W, entries: &[ReportEntry<'_>]) -> ReportResult<()> {
    let doc: Vec<JsonEntry<'_>> = entries.iter().map(JsonEntry::from).collect();
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
