//! CLI errors.

use graphsweep_catalog::CatalogError;
use graphsweep_core::{BackendError, CoreError};
use graphsweep_report::ReportError;
use graphsweep_runtime::EngineError;
use std::path::PathBuf;

/// Everything that can stop the binary
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Catalog could not be loaded or the selection is invalid
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Selection matched nothing
    #[error("no queries selected (try --list)")]
    EmptySelection,

    /// No password on the command line or in the environment
    #[error("missing password: provide -p/--password or set NEO4J_PASS")]
    MissingPassword,

    /// Endpoint flag does not form a usable URL
    #[error("invalid endpoint: {0}")]
    Endpoint(CoreError),

    /// HTTP client could not be built
    #[error("neo4j client error: {0}")]
    Client(BackendError),

    /// The run could not start
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Rendering failed
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Output file could not be created
    #[error("failed to create {path}: {source}")]
    Output {
        /// Target path
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// True for mistakes in how the binary was invoked
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::Catalog(CatalogError::InvalidCategory(_) | CatalogError::UnknownId(_))
                | Self::EmptySelection
                | Self::MissingPassword
                | Self::Endpoint(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors() {
        assert!(CliError::EmptySelection.is_usage());
        assert!(CliError::MissingPassword.is_usage());
        assert!(CliError::Catalog(CatalogError::UnknownId("x".to_string())).is_usage());
        assert!(!CliError::Engine(EngineError::Inventory(BackendError::new("down"))).is_usage());
        assert!(
            !CliError::Catalog(CatalogError::DuplicateId("x".to_string())).is_usage()
        );
    }
}
