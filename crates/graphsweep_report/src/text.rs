//! Plain text and console renderers.

use crate::entry::ReportEntry;
use crate::error::ReportResult;
use crate::format::one_line;
use console::style;
use graphsweep_core::OutcomeStatus;
use std::io::Write;

/// Width of the `=` rule closing each section
pub const SEPARATOR_WIDTH: usize = 100;

fn separator() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

/// Write the plain text report: one section per query, values comma-joined
///
/// # Errors
///
/// Returns error if writing fails
pub fn write_text<W: Write>(out: &mut W, entries: &[ReportEntry<'_>]) -> ReportResult<()> {
    for entry in entries {
        let query = entry.query;
        writeln!(out, "{}", query.sheet_name)?;
        writeln!(out, "{}", query.description)?;
        if let Some(finding) = query.finding() {
            writeln!(out, "finding title: {}", finding)?;
        }
        writeln!(out, "neo4j query: {}", one_line(&query.cypher))?;
        writeln!(out)?;

        match &entry.outcome.status {
            OutcomeStatus::Skipped(reason) => writeln!(out, "SKIPPED: {}", reason)?,
            OutcomeStatus::Failed(err) => writeln!(out, "ERROR: {}", err)?,
            OutcomeStatus::Succeeded(_) => {
                for row in entry.display_rows() {
                    writeln!(out, "{}", row.join(","))?;
                }
            }
        }
        writeln!(out, "{}", separator())?;
    }
    out.flush()?;
    Ok(())
}

/// Write the console report, styled when the terminal supports it
///
/// # Errors
///
/// Returns error if writing fails
pub fn write_console<W: Write>(out: &mut W, entries: &[ReportEntry<'_>]) -> ReportResult<()> {
    for entry in entries {
        let query = entry.query;
        writeln!(out, "{}", style(&query.sheet_name).bold())?;
        writeln!(out, "{}", query.description)?;
        if let Some(finding) = query.finding() {
            writeln!(out, "finding title: {}", style(finding).yellow())?;
        }
        writeln!(out, "neo4j query: {}", style(one_line(&query.cypher)).dim())?;
        writeln!(out)?;

        match &entry.outcome.status {
            OutcomeStatus::Skipped(reason) => {
                writeln!(out, "{} {}", style("SKIPPED:").yellow(), reason)?;
            }
            OutcomeStatus::Failed(err) => {
                writeln!(out, "{} {}", style("ERROR:").red().bold(), err)?;
            }
            OutcomeStatus::Succeeded(_) => {
                for row in entry.display_rows() {
                    writeln!(out, "{}", row.join(", "))?;
                }
            }
        }
        writeln!(out, "{}", separator())?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::entries;
    use crate::entry::fixtures::mixed;

    fn render_text() -> String {
        let (queries, outcomes) = mixed();
        let entries = entries(&queries, &outcomes).unwrap();
        let mut buf = Vec::new();
        write_text(&mut buf, &entries).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_text_sections() {
        let text = render_text();
        let sections: Vec<&str> = text.split(&separator()).collect();
        // four sections plus the trailing newline
        assert_eq!(sections.len(), 5);

        let first = sections[0];
        assert!(first.starts_with("users sheet\nusers description\nfinding title: users finding\n"));
        assert!(first.contains("neo4j query: MATCH (u:User) RETURN u.name AS user\n\n"));
        assert!(first.contains("ALICE@CORP.LOCAL,1970-01-01T00:00:00Z\n"));
        assert!(first.contains("BOB@CORP.LOCAL,\n"));

        assert!(sections[2].contains("SKIPPED: missing label: AZUser\n"));
        assert!(sections[3].contains("ERROR: syntax error\n"));
    }

    #[test]
    fn test_info_queries_have_no_finding_line() {
        let text = render_text();
        let last = text.split(&separator()).nth(3).unwrap();
        assert!(last.contains("broken description"));
        assert!(!last.contains("finding title"));
    }

    #[test]
    fn test_empty_result_section_has_no_rows() {
        let text = render_text();
        let empty = text.split(&separator()).nth(1).unwrap();
        assert!(empty.trim_end().ends_with("neo4j query: MATCH (u:User) RETURN u.name AS user"));
    }

    #[test]
    fn test_console_plain_when_not_a_terminal() {
        console::set_colors_enabled(false);
        let (queries, outcomes) = mixed();
        let entries = entries(&queries, &outcomes).unwrap();
        let mut buf = Vec::new();
        write_console(&mut buf, &entries).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("ALICE@CORP.LOCAL, 1970-01-01T00:00:00Z\n"));
        assert!(text.contains("SKIPPED: missing label: AZUser"));
        assert!(text.contains("ERROR: syntax error"));
        assert_eq!(text.matches(&separator()).count(), 4);
    }
}
