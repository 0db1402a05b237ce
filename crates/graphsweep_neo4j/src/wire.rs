//! JSON shapes of the HTTP transactional endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body
#[derive(Debug, Clone, Serialize)]
pub struct CommitRequest<'a> {
    /// Statements run in one auto-commit transaction
    pub statements: Vec<Statement<'a>>,
}

impl<'a> CommitRequest<'a> {
    /// Request with a single statement
    #[must_use]
    pub fn single(statement: &'a str) -> Self {
        Self::many(&[statement])
    }

    /// Request with several statements, answered in the same order
    #[must_use]
    pub fn many(statements: &[&'a str]) -> Self {
        Self {
            statements: statements
                .iter()
                .map(|s| Statement {
                    statement: *s,
                    result_data_contents: ["row"],
                })
                .collect(),
        }
    }
}

/// One statement
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement<'a> {
    /// Cypher text
    pub statement: &'a str,
    /// Result formats to return
    pub result_data_contents: [&'static str; 1],
}

/// Response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitResponse {
    /// One result per statement
    #[serde(default)]
    pub results: Vec<StatementResult>,
    /// Errors; a non-empty list means the transaction failed
    #[serde(default)]
    pub errors: Vec<WireError>,
}

/// Result of one statement
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementResult {
    /// Column names
    #[serde(default)]
    pub columns: Vec<String>,
    /// Rows
    #[serde(default)]
    pub data: Vec<DataRow>,
}

/// One row
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataRow {
    /// Values in column order
    #[serde(default)]
    pub row: Vec<Value>,
}

/// Error entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireError {
    /// Status code, e.g. `Neo.ClientError.Statement.SyntaxError`
    #[serde(default)]
    pub code: String,
    /// Message
    #[serde(default)]
    pub message: String,
}
