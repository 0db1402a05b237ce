//! Listing, schema and report output.

use crate::args::Cli;
use crate::error::CliError;
use graphsweep_catalog::QueryDef;
use graphsweep_core::SchemaInventory;
use graphsweep_report::{
    ReportEntry, Summary, write_console, write_core_csvs, write_format, write_summary, write_text,
    write_xlsx,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Print the selected catalog entries
pub fn print_list<W: Write>(out: &mut W, queries: &[QueryDef]) -> io::Result<()> {
    for q in queries {
        writeln!(out, "[{}] {}", q.category, q.title)?;
        writeln!(out, "  id: {}", q.id)?;
        writeln!(out, "  sheet: {}", q.sheet_name)?;
        writeln!(out, "  {}", q.description)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Print the backend's labels and relationship types
pub fn print_schema<W: Write>(out: &mut W, inventory: &SchemaInventory) -> io::Result<()> {
    writeln!(out, "== Neo4j schema summary ==")?;
    writeln!(
        out,
        "Node labels ({}): {}",
        inventory.labels.len(),
        inventory.labels.join(", ")
    )?;
    writeln!(
        out,
        "Relationship types ({}): {}",
        inventory.relationship_types.len(),
        inventory.relationship_types.join(", ")
    )?;
    out.flush()
}

fn create(path: &Path) -> Result<BufWriter<File>, CliError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| CliError::Output {
            path: path.to_path_buf(),
            source,
        })
}

/// Write every report the flags ask for.
///
/// A structured `--format` replaces the text and console reports.
pub fn write_reports(cli: &Cli, entries: &[ReportEntry<'_>]) -> Result<(), CliError> {
    if let Some(format) = cli.format {
        match &cli.out {
            Some(path) => {
                write_format(&mut create(path)?, format, entries)?;
                info!(path = %path.display(), %format, "wrote structured output");
            }
            None => write_format(&mut io::stdout().lock(), format, entries)?,
        }
    } else {
        if let Some(path) = &cli.text {
            write_text(&mut create(path)?, entries)?;
            info!(path = %path.display(), "wrote text report");
        }
        if cli.console_output() {
            write_console(&mut io::stdout().lock(), entries)?;
        }
    }

    if let Some(path) = &cli.xlsx {
        write_xlsx(path, entries, cli.skip_empty)?;
        info!(path = %path.display(), skip_empty = cli.skip_empty, "wrote xlsx report");
    }

    if let Some(dir) = &cli.core_csv {
        let written = write_core_csvs(dir, entries)?;
        info!(dir = %dir.display(), files = written.len(), "wrote core csv exports");
    }

    if cli.summary {
        write_summary(&mut io::stderr().lock(), &Summary::from_entries(entries))?;
    }
    Ok(())
}
