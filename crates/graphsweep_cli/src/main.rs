//! graphsweep CLI
//!
//! Runs the BloodHound finding queries against a Neo4j database with
//! bounded parallelism and renders the results.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod args;
mod error;
mod logging;
mod output;

use args::Cli;
use clap::Parser;
use color_eyre::Result;
use error::CliError;
use graphsweep_catalog::{Catalog, Selection};
use graphsweep_neo4j::Neo4jBackend;
use graphsweep_report::entries;
use graphsweep_runtime::{BatchEngine, CancellationToken};
use std::io;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::init(cli.log_json);

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_usage() => {
            eprintln!("error: {}", err);
            eprintln!("hint: run with -h for usage");
            std::process::exit(2);
        }
        Err(err) => Err(err.into()),
    }
}

fn load_catalog(cli: &Cli) -> Result<Catalog, CliError> {
    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_json_file(path)?,
        None => Catalog::builtin()?,
    };
    Ok(catalog)
}

/// Cancel `token` on Ctrl-C until the token is cancelled some other way
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    warn!("interrupted, cancelling run");
                    token.cancel();
                }
            }
        }
    });
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let catalog = load_catalog(&cli)?;
    let selection = cli.selection()?;

    if cli.list {
        let listed = catalog.select(&Selection {
            id: None,
            ..selection.clone()
        })?;
        output::print_list(&mut io::stdout().lock(), &listed).map_err(|source| {
            CliError::Output {
                path: "stdout".into(),
                source,
            }
        })?;
        return Ok(());
    }

    let queries = catalog.select(&selection)?;
    if queries.is_empty() && !cli.schema {
        return Err(CliError::EmptySelection);
    }

    let config = cli.neo4j_config()?;
    info!(endpoint = %config.endpoint, db = %cli.db, user = %cli.username, "connecting");
    let backend = Neo4jBackend::new(config).map_err(CliError::Client)?;
    let engine = BatchEngine::new(Arc::new(backend), cli.execution_options());

    if cli.schema {
        let inventory = engine.inventory().await?;
        output::print_schema(&mut io::stdout().lock(), &inventory).map_err(|source| {
            CliError::Output {
                path: "stdout".into(),
                source,
            }
        })?;
        return Ok(());
    }

    let jobs = Catalog::jobs(&queries);
    let options = engine.options();
    info!(
        queries = jobs.len(),
        limit = options.row_limit,
        parallel = options.parallelism,
        query_timeout_s = options.per_job_timeout.map_or(0, |t| t.as_secs()),
        "running queries"
    );

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    let report = engine.run_until(&jobs, cancel.clone()).await;
    cancel.cancel();
    let report = report?;

    if report.timed_out {
        warn!("run deadline reached before every query finished");
    }
    info!(
        run_id = %report.run_id,
        succeeded = report.succeeded(),
        failed = report.failed(),
        skipped = report.skipped(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "run complete"
    );

    let entries = entries(&queries, &report.outcomes)?;
    output::write_reports(&cli, &entries)?;
    Ok(())
}
