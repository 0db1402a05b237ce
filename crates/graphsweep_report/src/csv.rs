//! CSV renderers.
//!
//! Records are written through `csv::Writer` with CRLF terminators; a field
//! is quoted only when it needs to be.

use crate::entry::{EntryStatus, ReportEntry};
use crate::error::ReportResult;
use crate::format::format_value;
use graphsweep_core::OutcomeStatus;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Baseline inventory queries exported to their own CSV files
pub const CORE_CSV_FILES: [(&str, &str); 4] = [
    ("ad-all-users-samaccountname", "users.csv"),
    ("ad-all-computers-fqdn", "computers.csv"),
    ("ad-domain-admins", "domain_admins.csv"),
    ("ad-domain-controllers", "domain_controllers.csv"),
];

const FIXED_COLUMNS: [&str; 5] = ["query_id", "query_title", "category", "status", "detail"];

// status rows are shorter than the header, so records may vary in length
fn writer<W: Write>(out: W) -> ::csv::Writer<W> {
    ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::CRLF)
        .flexible(true)
        .from_writer(out)
}

/// Write one table covering every query.
///
/// Columns are `query_id, query_title, category, status, detail` followed by
/// the sorted union of result columns. A query with no rows still gets one
/// line; `detail` carries the error message or skip reason.
///
/// # Errors
///
/// Returns error if writing fails
pub fn write_csv<W: Write>(out: &mut W, entries: &[ReportEntry<'_>]) -> ReportResult<()> {
    let mut out = writer(out);
    let keys: BTreeSet<&str> = entries
        .iter()
        .flat_map(|e| e.outcome.result_set().columns().iter().map(String::as_str))
        .collect();

    out.write_record(FIXED_COLUMNS.iter().copied().chain(keys.iter().copied()))?;

    for entry in entries {
        let query = entry.query;
        let status = entry.status();
        let detail = match &entry.outcome.status {
            OutcomeStatus::Failed(err) => err.to_string(),
            OutcomeStatus::Skipped(reason) => reason.to_string(),
            OutcomeStatus::Succeeded(_) => String::new(),
        };
        let prefix = [
            query.id.clone(),
            query.title.clone(),
            query.category.to_string(),
            status.to_string(),
            detail,
        ];

        let rs = entry.outcome.result_set();
        if rs.is_empty() {
            let blanks = std::iter::repeat_n(String::new(), keys.len());
            out.write_record(prefix.iter().cloned().chain(blanks))?;
            continue;
        }

        let index = rs.column_index();
        for row in rs.rows() {
            let values = keys.iter().map(|key| {
                index
                    .get(key)
                    .and_then(|&i| row.get(i))
                    .map(|value| format_value(key, value))
                    .unwrap_or_default()
            });
            out.write_record(prefix.iter().cloned().chain(values))?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Write one entry as a standalone table under its declared headers.
///
/// Skipped and failed queries produce a single `SKIPPED, reason` or
/// `ERROR, message` line under the header.
///
/// # Errors
///
/// Returns error if writing fails
pub fn write_entry_csv<W: Write>(out: &mut W, entry: &ReportEntry<'_>) -> ReportResult<()> {
    let mut out = writer(out);
    let rs = entry.outcome.result_set();
    if entry.query.headers.is_empty() {
        out.write_record(rs.columns())?;
    } else {
        out.write_record(&entry.query.headers)?;
    }

    match (&entry.outcome.status, entry.status()) {
        (OutcomeStatus::Skipped(reason), _) => {
            out.write_record(["SKIPPED".to_string(), reason.to_string()])?;
        }
        (OutcomeStatus::Failed(err), _) => {
            out.write_record(["ERROR".to_string(), err.to_string()])?;
        }
        (_, EntryStatus::Empty) => {}
        _ => {
            for row in entry.display_rows() {
                out.write_record(&row)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Export the baseline inventory queries present in `entries` to `dir`
///
/// Creates the directory if needed and returns the files written.
///
/// # Errors
///
/// Returns error if the directory or a file cannot be written
pub fn write_core_csvs(dir: impl AsRef<Path>, entries: &[ReportEntry<'_>]) -> ReportResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for (id, file) in CORE_CSV_FILES {
        let Some(entry) = entries.iter().find(|e| e.query.id == id) else {
            continue;
        };
        let path = dir.join(file);
        let mut out = BufWriter::new(File::create(&path)?);
        write_entry_csv(&mut out, entry)?;
        debug!(path = %path.display(), id, "core csv written");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::entries;
    use crate::entry::fixtures::{mixed, query, rows};
    use graphsweep_catalog::Category;
    use graphsweep_core::{BackendError, JobOutcome};
    use serde_json::json;

    #[test]
    fn test_entry_csv_escapes_quotes_and_newlines() {
        let q = query("notes", Category::Info, &["User", "Description"]);
        let outcome = JobOutcome::succeeded(
            0,
            rows(
                &["user", "description"],
                vec![vec![json!("alice"), json!("say \"hi\"\nthen leave")]],
            ),
        );
        let entry = crate::ReportEntry {
            query: &q,
            outcome: &outcome,
        };
        let mut buf = Vec::new();
        write_entry_csv(&mut buf, &entry).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "User,Description\r\nalice,\"say \"\"hi\"\"\nthen leave\"\r\n"
        );
    }

    #[test]
    fn test_combined_csv() {
        let (queries, outcomes) = mixed();
        let entries = entries(&queries, &outcomes).unwrap();
        let mut buf = Vec::new();
        write_csv(&mut buf, &entries).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.split("\r\n").filter(|l| !l.is_empty()).collect();

        assert_eq!(lines[0], "query_id,query_title,category,status,detail,pwdlastset,user");
        assert_eq!(lines[1], "users,users title,AD,ok,,1970-01-01T00:00:00Z,ALICE@CORP.LOCAL");
        assert_eq!(lines[2], "users,users title,AD,ok,,,BOB@CORP.LOCAL");
        assert_eq!(lines[3], "empty,empty title,AD,empty,,,");
        assert_eq!(lines[4], "azure,azure title,EntraID,skipped,missing label: AZUser,,");
        assert_eq!(lines[5], "broken,broken title,INFO,error,syntax error,,");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_entry_csv_quotes_values() {
        let q = query("groups", Category::Ad, &["Group", "Members"]);
        let outcome = JobOutcome::succeeded(
            0,
            rows(
                &["group", "members"],
                vec![vec![json!("DOMAIN ADMINS"), json!(["ALICE", "BOB"])]],
            ),
        );
        let entry = crate::ReportEntry {
            query: &q,
            outcome: &outcome,
        };
        let mut buf = Vec::new();
        write_entry_csv(&mut buf, &entry).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Group,Members\r\nDOMAIN ADMINS,\"ALICE, BOB\"\r\n"
        );
    }

    #[test]
    fn test_entry_csv_error_row() {
        let q = query("q", Category::Ad, &["User"]);
        let outcome = JobOutcome::failed(0, BackendError::new("boom, again").into());
        let entry = crate::ReportEntry {
            query: &q,
            outcome: &outcome,
        };
        let mut buf = Vec::new();
        write_entry_csv(&mut buf, &entry).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "User\r\nERROR,\"boom, again\"\r\n");
    }

    #[test]
    fn test_core_csvs_written_for_present_baselines() {
        let users = query("ad-all-users-samaccountname", Category::Ad, &["User"]);
        let other = query("ad-kerberoastable", Category::Ad, &["User"]);
        let queries = vec![users, other];
        let outcomes = vec![
            JobOutcome::succeeded(0, rows(&["user"], vec![vec![json!("alice")]])),
            JobOutcome::succeeded(1, rows(&["user"], vec![vec![json!("svc_sql")]])),
        ];
        let entries = entries(&queries, &outcomes).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("core");
        let written = write_core_csvs(&target, &entries).unwrap();

        assert_eq!(written, vec![target.join("users.csv")]);
        let users_csv = std::fs::read_to_string(target.join("users.csv")).unwrap();
        assert_eq!(users_csv, "User\r\nalice\r\n");
        assert!(!target.join("computers.csv").exists());
    }
}
