//! graphsweep reporting
//!
//! Renders the outcomes of a run next to the catalog entries that produced
//! them. The stream writers take a `std::io::Write`; the caller decides
//! whether that is stdout or a file. Workbooks and the baseline CSV exports
//! go straight to disk.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod csv;
pub mod entry;
pub mod error;
pub mod format;
pub mod json;
pub mod summary;
pub mod text;
pub mod xlsx;

// Re-exports
pub use crate::csv::{CORE_CSV_FILES, write_core_csvs, write_csv, write_entry_csv};
pub use entry::{EntryStatus, ReportEntry, entries};
pub use error::{ReportError, ReportResult};
pub use format::{OutputFormat, format_value, one_line};
pub use json::write_json;
pub use summary::{Summary, SummaryRow, write_summary};
pub use text::{SEPARATOR_WIDTH, write_console, write_text};
pub use xlsx::{SUMMARY_SHEET, build_workbook, sheet_name, write_xlsx};

use std::io::Write;

/// Write entries in the requested structured format
///
/// # Errors
///
/// Returns error if writing or encoding fails
pub fn write_format<W: Write>(
    out: &mut W,
    format: OutputFormat,
    entries: &[ReportEntry<'_>],
) -> ReportResult<()> {
    match format {
        OutputFormat::Text => write_text(out, entries),
        OutputFormat::Json => write_json(out, entries),
        OutputFormat::Csv => write_csv(out, entries),
    }
}
