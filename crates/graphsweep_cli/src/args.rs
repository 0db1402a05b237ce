//! Command-line flags.

use crate::error::CliError;
use clap::Parser;
use graphsweep_catalog::{CatalogError, CategoryFilter, Selection};
use graphsweep_core::ExecutionOptions;
use graphsweep_core::options::DEFAULT_PARALLELISM;
use graphsweep_neo4j::Neo4jConfig;
use graphsweep_report::OutputFormat;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

/// Run BloodHound finding queries against Neo4j and report the results
#[derive(Debug, Parser)]
#[command(name = "graphsweep", version)]
#[command(about = "Run BloodHound finding queries against Neo4j in parallel", long_about = None)]
pub struct Cli {
    /// Neo4j server IP or host (used when --neo4j-uri is not set)
    #[arg(long, default_value = "127.0.0.1", help_heading = "Connection")]
    pub neo4j_ip: String,

    /// Neo4j URI, e.g. bolt://10.0.0.5:7687 or http://10.0.0.5:7474
    #[arg(long, help_heading = "Connection")]
    pub neo4j_uri: Option<String>,

    /// Database name
    #[arg(long, default_value = "neo4j", help_heading = "Connection")]
    pub db: String,

    /// Neo4j username
    #[arg(short = 'u', long, default_value = "neo4j", help_heading = "Connection")]
    pub username: String,

    /// Neo4j password
    #[arg(
        short = 'p',
        long,
        env = "NEO4J_PASS",
        hide_env_values = true,
        help_heading = "Connection"
    )]
    pub password: Option<String>,

    /// List the selected queries and exit
    #[arg(long, help_heading = "Selection")]
    pub list: bool,

    /// Print node labels and relationship types and exit
    #[arg(long, help_heading = "Selection")]
    pub schema: bool,

    /// Run a single query by id
    #[arg(long, help_heading = "Selection")]
    pub id: Option<String>,

    /// Category filter: all|AD|EntraID|INFO
    #[arg(long, default_value = "all", help_heading = "Selection")]
    pub category: String,

    /// Include informational/inventory queries
    #[arg(short = 'i', long, help_heading = "Selection")]
    pub info: bool,

    /// Include Entra ID queries
    #[arg(long, help_heading = "Selection")]
    pub entra: bool,

    /// Load queries from a JSON catalog instead of the built-in pack
    #[arg(long, value_name = "FILE", help_heading = "Selection")]
    pub catalog: Option<PathBuf>,

    /// Write the text report to a file
    #[arg(short = 't', long, value_name = "FILE", help_heading = "Output")]
    pub text: Option<PathBuf>,

    /// Write an XLSX workbook: a summary sheet plus one sheet per query
    #[arg(short = 'x', long, value_name = "FILE", help_heading = "Output")]
    pub xlsx: Option<PathBuf>,

    /// Leave empty, skipped and failed queries out of the workbook
    #[arg(long, help_heading = "Output")]
    pub skip_empty: bool,

    /// Print results to the console
    #[arg(short = 'v', long, help_heading = "Output")]
    pub verbose: bool,

    /// Structured output format: text|json|csv
    #[arg(long, help_heading = "Output")]
    pub format: Option<OutputFormat>,

    /// Structured output file (default stdout)
    #[arg(long, value_name = "FILE", requires = "format", help_heading = "Output")]
    pub out: Option<PathBuf>,

    /// Print a per-query status summary to stderr
    #[arg(long, help_heading = "Output")]
    pub summary: bool,

    /// Export the baseline inventory queries as CSV files into a directory
    #[arg(long, value_name = "DIR", help_heading = "Output")]
    pub core_csv: Option<PathBuf>,

    /// Max rows per query (0 = unlimited); also appends LIMIT when missing
    #[arg(long, default_value_t = 0, help_heading = "Performance")]
    pub limit: usize,

    /// Overall run timeout in seconds (0 disables)
    #[arg(long, default_value_t = 60, value_name = "SECS", help_heading = "Performance")]
    pub timeout: u64,

    /// Per-query timeout in seconds (0 disables)
    #[arg(long, default_value_t = 30, value_name = "SECS", help_heading = "Performance")]
    pub query_timeout: u64,

    /// Number of queries to run in parallel
    #[arg(long, default_value_t = DEFAULT_PARALLELISM, help_heading = "Performance")]
    pub parallel: usize,

    /// Retries for transient Neo4j errors
    #[arg(long, default_value_t = 1, help_heading = "Performance")]
    pub retries: u32,

    /// Stop dispatching queries after the first error
    #[arg(long, help_heading = "Performance")]
    pub fail_fast: bool,

    /// Run every query even if it references labels the database lacks
    #[arg(long, help_heading = "Performance")]
    pub no_schema_check: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Cli {
    /// Engine options from the performance flags
    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions::new(self.db.clone())
            .with_row_limit(self.limit)
            .with_parallelism(self.parallel)
            .with_per_job_timeout(seconds(self.query_timeout))
            .with_retry_count(self.retries)
            .with_fail_fast(self.fail_fast)
            .with_run_timeout(seconds(self.timeout))
            .with_admission_check(!self.no_schema_check)
    }

    /// Catalog selection from the selection flags
    ///
    /// # Errors
    ///
    /// Returns error if the category is not recognized
    pub fn selection(&self) -> Result<Selection, CatalogError> {
        let mut selection = Selection::default()
            .with_info(self.info)
            .with_entra(self.entra)
            .with_category(CategoryFilter::parse(&self.category)?);
        if let Some(id) = self.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            selection = selection.with_id(id);
        }
        Ok(selection)
    }

    /// Backend connection settings
    ///
    /// # Errors
    ///
    /// Returns error if no password was given or the endpoint is unusable
    pub fn neo4j_config(&self) -> Result<Neo4jConfig, CliError> {
        let password = self
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(CliError::MissingPassword)?;
        let password = SecretString::from(password.to_string());

        let config = match self.neo4j_uri.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(uri) => Neo4jConfig::new(uri, self.username.clone(), password),
            None => Neo4jConfig::for_host(&self.neo4j_ip, self.username.clone(), password),
        };
        config.map_err(CliError::Endpoint)
    }

    /// True when results go to the console
    pub fn console_output(&self) -> bool {
        self.verbose || (self.text.is_none() && self.xlsx.is_none() && self.format.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphsweep_catalog::Category;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("graphsweep").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_map_to_engine_defaults() {
        let cli = parse(&[]);
        let opts = cli.execution_options();
        assert_eq!(opts, ExecutionOptions::default());
        assert!(cli.console_output());
        assert!(!cli.log_json);
    }

    #[test]
    fn test_performance_flags() {
        let cli = parse(&[
            "--limit",
            "500",
            "--parallel",
            "8",
            "--timeout",
            "0",
            "--query-timeout",
            "5",
            "--retries",
            "3",
            "--fail-fast",
            "--no-schema-check",
            "--db",
            "bloodhound",
        ]);
        let opts = cli.execution_options();
        assert_eq!(opts.database, "bloodhound");
        assert_eq!(opts.row_limit, 500);
        assert_eq!(opts.parallelism, 8);
        assert_eq!(opts.run_timeout, None);
        assert_eq!(opts.per_job_timeout, Some(Duration::from_secs(5)));
        assert_eq!(opts.retry_count, 3);
        assert!(opts.fail_fast);
        assert!(!opts.admission_check);
    }

    #[test]
    fn test_selection_flags() {
        let cli = parse(&["-i", "--entra", "--category", "entraid", "--id", " azure-global-admins "]);
        let selection = cli.selection().unwrap();
        assert!(selection.include_info);
        assert!(selection.include_entra);
        assert_eq!(selection.category, CategoryFilter::Only(Category::EntraId));
        assert_eq!(selection.id.as_deref(), Some("azure-global-admins"));
    }

    #[test]
    fn test_invalid_category() {
        let cli = parse(&["--category", "azure"]);
        assert!(matches!(cli.selection(), Err(CatalogError::InvalidCategory(_))));
    }

    #[test]
    fn test_neo4j_config_from_uri() {
        let cli = parse(&["-p", "hunter2", "--neo4j-uri", "bolt://10.0.0.5:7687", "-u", "admin"]);
        let config = cli.neo4j_config().unwrap();
        assert_eq!(config.endpoint.as_str(), "http://10.0.0.5:7474/");
        assert_eq!(config.user, "admin");
    }

    #[test]
    fn test_neo4j_config_from_host() {
        let cli = parse(&["--password", "hunter2", "--neo4j-ip", "10.1.1.1"]);
        let config = cli.neo4j_config().unwrap();
        assert_eq!(config.endpoint.host_str(), Some("10.1.1.1"));
        assert_eq!(config.endpoint.port_or_known_default(), Some(7474));
    }

    #[test]
    fn test_empty_password_rejected() {
        let cli = parse(&["-p", ""]);
        assert!(matches!(cli.neo4j_config(), Err(CliError::MissingPassword)));
    }

    #[test]
    fn test_output_flags() {
        let cli = parse(&["--format", "json", "--out", "report.json"]);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(!cli.console_output());

        let cli = parse(&["-t", "report.txt", "-v"]);
        assert!(cli.console_output());

        assert!(Cli::try_parse_from(["graphsweep", "--format", "xlsx"]).is_err());
        assert!(Cli::try_parse_from(["graphsweep", "--out", "x.json"]).is_err());
    }
}
