//! XLSX workbook renderer.
//!
//! The workbook opens with a `Summary` sheet, then one sheet per query in
//! report order. A query sheet carries the description, the finding
//! headline and the query text, then the result table under the declared
//! headers.

use crate::entry::{EntryStatus, ReportEntry};
use crate::error::ReportResult;
use crate::format::one_line;
use crate::summary::Summary;
use graphsweep_core::OutcomeStatus;
use rust_xlsxwriter::{ColNum, RowNum, Workbook, Worksheet, XlsxError};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Name of the leading totals sheet
pub const SUMMARY_SHEET: &str = "Summary";

const MAX_SHEET_NAME: usize = 31;
const MIN_COLUMN_WIDTH: usize = 10;
const MAX_COLUMN_WIDTH: usize = 60;
const WIDTH_SAMPLE_ROWS: usize = 300;

const SUMMARY_HEADERS: [&str; 7] = ["order", "category", "sheet", "id", "status", "rows", "query"];
const SUMMARY_WIDTHS: [f64; 7] = [8.0, 10.0, 30.0, 30.0, 10.0, 10.0, 80.0];

/// Turn a display name into a legal worksheet name.
///
/// Characters Excel rejects are replaced or dropped and the result is cut
/// to 31 characters. An empty name becomes `Sheet`.
#[must_use]
pub fn sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter_map(|c| match c {
            ':' | '\\' | '/' => Some('-'),
            '?' | '*' => None,
            '[' => Some('('),
            ']' => Some(')'),
            other => Some(other),
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let name = if cleaned.is_empty() { "Sheet" } else { cleaned };
    name.chars().take(MAX_SHEET_NAME).collect()
}

// Excel compares sheet names case-insensitively.
#[derive(Debug, Default)]
struct SheetNames {
    taken: HashSet<String>,
}

impl SheetNames {
    fn claim(&mut self, raw: &str) -> String {
        let base = sheet_name(raw);
        let mut name = base.clone();
        let mut n = 2;
        while !self.taken.insert(name.to_lowercase()) {
            let suffix = format!(" ({})", n);
            let keep = MAX_SHEET_NAME - suffix.chars().count();
            name = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
            n += 1;
        }
        name
    }
}

/// Sheet names for the queries that get a sheet, in report order
fn sheet_plan<'e, 'a>(
    entries: &'e [ReportEntry<'a>],
    skip_empty: bool,
) -> Vec<(String, &'e ReportEntry<'a>)> {
    let mut names = SheetNames::default();
    names.claim(SUMMARY_SHEET);
    entries
        .iter()
        .filter(|entry| !skip_empty || entry.status() == EntryStatus::Ok)
        .map(|entry| (names.claim(&entry.query.sheet_name), entry))
        .collect()
}

fn col(index: usize) -> ColNum {
    ColNum::try_from(index).unwrap_or(ColNum::MAX)
}

fn display_width(value: &str) -> usize {
    value
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '\t'))
        .take(200)
        .count()
}

fn write_summary_sheet(sheet: &mut Worksheet, entries: &[ReportEntry<'_>]) -> Result<(), XlsxError> {
    let summary = Summary::from_entries(entries);
    sheet.set_name(SUMMARY_SHEET)?;
    for (i, (header, width)) in SUMMARY_HEADERS.iter().zip(SUMMARY_WIDTHS).enumerate() {
        sheet.write_string(0, col(i), *header)?;
        sheet.set_column_width(col(i), width)?;
    }

    let mut row: RowNum = 1;
    for (line, entry) in summary.rows.iter().zip(entries) {
        sheet.write_number(row, 0, line.order as f64)?;
        sheet.write_string(row, 1, line.category.as_str())?;
        sheet.write_string(row, 2, &line.sheet)?;
        sheet.write_string(row, 3, &line.id)?;
        sheet.write_string(row, 4, line.status.as_str())?;
        sheet.write_number(row, 5, line.rows as f64)?;
        sheet.write_string(row, 6, one_line(&entry.query.cypher))?;
        row += 1;
    }

    row += 1;
    let totals = [
        "totals".to_string(),
        format!("ok={}", summary.ok),
        format!("empty={}", summary.empty),
        format!("skipped={}", summary.skipped),
        format!("error={}", summary.error),
        format!("total={}", summary.total()),
    ];
    for (i, value) in totals.iter().enumerate() {
        sheet.write_string(row, col(i), value)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_query_sheet(sheet: &mut Worksheet, name: &str, entry: &ReportEntry<'_>) -> Result<(), XlsxError> {
    sheet.set_name(name)?;
    let query = entry.query;

    let mut row: RowNum = 0;
    sheet.write_string(row, 0, &query.description)?;
    row += 1;
    if let Some(finding) = query.finding() {
        sheet.write_string(row, 0, "finding title:")?;
        sheet.write_string(row, 1, finding)?;
        row += 1;
    }
    sheet.write_string(row, 0, "neo4j query:")?;
    sheet.write_string(row, 1, &query.cypher)?;
    row += 2;

    let rs = entry.outcome.result_set();
    let headers: &[String] = if query.headers.is_empty() {
        rs.columns()
    } else {
        &query.headers
    };
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for (i, header) in headers.iter().enumerate() {
        sheet.write_string(row, col(i), header)?;
    }
    row += 1;

    match &entry.outcome.status {
        OutcomeStatus::Skipped(reason) => {
            sheet.write_string(row, 0, "SKIPPED")?;
            sheet.write_string(row, 1, reason.to_string())?;
        }
        OutcomeStatus::Failed(err) => {
            sheet.write_string(row, 0, "ERROR")?;
            sheet.write_string(row, 1, err.to_string())?;
        }
        OutcomeStatus::Succeeded(_) => {
            for (n, values) in entry.display_rows().iter().enumerate() {
                for (i, value) in values.iter().enumerate() {
                    if value.is_empty() {
                        continue;
                    }
                    sheet.write_string(row, col(i), value)?;
                    if let Some(width) = widths.get_mut(i).filter(|_| n < WIDTH_SAMPLE_ROWS) {
                        *width = (*width).max(display_width(value));
                    }
                }
                row += 1;
            }
        }
    }

    for (i, width) in widths.iter().enumerate() {
        if *width > 0 {
            let width = (*width).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
            sheet.set_column_width(col(i), width as f64)?;
        }
    }
    Ok(())
}

/// Build the workbook in memory.
///
/// With `skip_empty`, only queries that returned rows get a sheet; the
/// summary always lists every query.
///
/// # Errors
///
/// Returns error if a cell or sheet is rejected by the writer
pub fn build_workbook(entries: &[ReportEntry<'_>], skip_empty: bool) -> ReportResult<Workbook> {
    let mut workbook = Workbook::new();
    write_summary_sheet(workbook.add_worksheet(), entries)?;
    for (name, entry) in sheet_plan(entries, skip_empty) {
        write_query_sheet(workbook.add_worksheet(), &name, entry)?;
    }
    Ok(workbook)
}

/// Write the workbook to `path`
///
/// # Errors
///
/// Returns error if the workbook cannot be built or saved
pub fn write_xlsx(path: impl AsRef<Path>, entries: &[ReportEntry<'_>], skip_empty: bool) -> ReportResult<()> {
    let path = path.as_ref();
    let mut workbook = build_workbook(entries, skip_empty)?;
    workbook.save(path)?;
    debug!(path = %path.display(), queries = entries.len(), skip_empty, "workbook written");
    Ok(())
}
