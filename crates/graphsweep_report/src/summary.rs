//! Run summary table.

use crate::entry::{EntryStatus, ReportEntry};
use crate::error::ReportResult;
use graphsweep_catalog::Category;
use serde::Serialize;
use std::io::Write;

/// One line of the summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    /// 1-based position in the report
    pub order: usize,
    /// Query category
    pub category: Category,
    /// Sheet name
    pub sheet: String,
    /// Query id
    pub id: String,
    /// Outcome status
    pub status: EntryStatus,
    /// Rows returned
    pub rows: usize,
}

/// Per-query statuses and totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// One row per query, in report order
    pub rows: Vec<SummaryRow>,
    /// Succeeded with rows
    pub ok: usize,
    /// Succeeded without rows
    pub empty: usize,
    /// Never executed
    pub skipped: usize,
    /// Failed
    pub error: usize,
}

impl Summary {
    /// Tally entries
    #[must_use]
    pub fn from_entries(entries: &[ReportEntry<'_>]) -> Self {
        let mut summary = Self::default();
        for (pos, entry) in entries.iter().enumerate() {
            let status = entry.status();
            match status {
                EntryStatus::Ok => summary.ok += 1,
                EntryStatus::Empty => summary.empty += 1,
                EntryStatus::Skipped => summary.skipped += 1,
                EntryStatus::Error => summary.error += 1,
            }
            summary.rows.push(SummaryRow {
                order: pos + 1,
                category: entry.query.category,
                sheet: entry.query.sheet_name.clone(),
                id: entry.query.id.clone(),
                status,
                rows: entry.outcome.result_set().len(),
            });
        }
        summary
    }

    /// Number of queries
    #[must_use]
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    /// True when any query failed
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error > 0
    }
}

/// Write the summary as an aligned table followed by a totals line
///
/// # Errors
///
/// Returns error if writing fails
pub fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> ReportResult<()> {
    let sheet_width = summary
        .rows
        .iter()
        .map(|r| r.sheet.chars().count())
        .max()
        .unwrap_or(0)
        .max("sheet".len());
    let id_width = summary
        .rows
        .iter()
        .map(|r| r.id.len())
        .max()
        .unwrap_or(0)
        .max("id".len());

    writeln!(
        out,
        "{:>5}  {:<8}  {:<sw$}  {:<iw$}  {:<7}  {:>6}",
        "order",
        "category",
        "sheet",
        "id",
        "status",
        "rows",
        sw = sheet_width,
        iw = id_width
    )?;
    for row in &summary.rows {
        writeln!(
            out,
            "{:>5}  {:<8}  {:<sw$}  {:<iw$}  {:<7}  {:>6}",
            row.order,
            row.category.as_str(),
            row.sheet,
            row.id,
            row.status.as_str(),
            row.rows,
            sw = sheet_width,
            iw = id_width
        )?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "totals  ok={} empty={} skipped={} error={} total={}",
        summary.ok,
        summary.empty,
        summary.skipped,
        summary.error,
        summary.total()
    )?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::entries;
    use crate::entry::fixtures::mixed;

    #[test]
    fn test_summary_counts() {
        let (queries, outcomes) = mixed();
        let entries = entries(&queries, &outcomes).unwrap();
        let summary = Summary::from_entries(&entries);
        assert_eq!(summary.ok, 1);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.error, 1);
        assert_eq!(summary.total(), 4);
        assert!(summary.has_errors());
        assert_eq!(summary.rows[0].rows, 2);
        assert_eq!(summary.rows[3].order, 4);
    }

    #[test]
    fn test_write_summary() {
        let (queries, outcomes) = mixed();
        let entries = entries(&queries, &outcomes).unwrap();
        let mut buf = Vec::new();
        write_summary(&mut buf, &Summary::from_entries(&entries)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("order  category  sheet"));
        assert!(lines[1].contains("users sheet"));
        assert!(lines[1].contains("ok"));
        assert!(lines[3].contains("skipped"));
        assert_eq!(
            lines.last().copied(),
            Some("totals  ok=1 empty=1 skipped=1 error=1 total=4")
        );
    }

    #[test]
    fn test_empty_summary() {
        let summary = Summary::from_entries(&[]);
        assert_eq!(summary.total(), 0);
        assert!(!summary.has_errors());
    }
}
