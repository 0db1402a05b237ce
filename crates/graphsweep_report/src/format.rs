//! Value and query-text formatting shared by the renderers.

use crate::error::ReportError;
use chrono::{DateTime, SecondsFormat};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Column key fragments whose numeric values are epoch seconds
const EPOCH_COLUMN_MARKERS: [&str; 2] = ["pwdlastset", "lastlogon"];

/// Structured output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text sections
    #[default]
    Text,
    /// Pretty-printed JSON array
    Json,
    /// One CSV table across all queries
    Csv,
}

impl FromStr for OutputFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(ReportError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}

/// Collapse all whitespace runs, newlines included, into single spaces
#[must_use]
pub fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render one result value for display.
///
/// `null` renders empty, strings render unquoted and lists are joined with
/// `", "`. Numbers in password-set and last-logon columns are epoch seconds
/// and render as RFC 3339 UTC timestamps.
#[must_use]
pub fn format_value(column_key: &str, value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) if is_epoch_column(column_key) => {
            let secs = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64));
            secs.and_then(|s| DateTime::from_timestamp(s, 0))
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_else(|| n.to_string())
        }
        Value::Array(items) => items
            .iter()
            .map(|item| format_value(column_key, item))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn is_epoch_column(column_key: &str) -> bool {
    let key = column_key.to_lowercase();
    EPOCH_COLUMN_MARKERS.iter().any(|m| key.contains(m))
}
