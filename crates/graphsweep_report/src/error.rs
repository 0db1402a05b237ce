//! Report errors.

/// Report result type
pub type ReportResult<T> = Result<T, ReportError>;

/// Report errors
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Writing the report failed
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failed
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding failed
    #[error("failed to write csv: {0}")]
    Csv(#[from] ::csv::Error),

    /// Workbook could not be built or saved
    #[error("failed to write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Queries and outcomes do not line up
    #[error("report has {queries} queries but {outcomes} outcomes")]
    Mismatch {
        /// Number of queries
        queries: usize,
        /// Number of outcomes
        outcomes: usize,
    },

    /// Output format not recognized
    #[error("unknown output format {0:?} (expected: text|json|csv)")]
    UnknownFormat(String),
}
