//! Jobs and result sets.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// One unit of query work with a stable position in the original request.
///
/// Built once per run from the catalog and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    index: usize,
    id: String,
    display_name: String,
    query: String,
}

impl Job {
    /// Create a job at `index`
    #[must_use]
    pub fn new(
        index: usize,
        id: impl Into<String>,
        display_name: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            index,
            id: id.into(),
            display_name: display_name.into(),
            query: query.into(),
        }
    }

    /// Position in the original job list
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Catalog identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name shown in progress output and reports
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Query text sent to the backend
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Tabular result of one query.
///
/// Columns are unique and every row has exactly one value per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// The empty result set
    pub const EMPTY: ResultSet = ResultSet {
        columns: Vec::new(),
        rows: Vec::new(),
    };

    /// Build a result set, checking column uniqueness and row widths
    ///
    /// # Errors
    ///
    /// Returns error if a column repeats or a row has the wrong width
    pub fn try_new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> CoreResult<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(CoreError::Validation {
                    field: "columns".to_string(),
                    reason: format!("duplicate column {}", column),
                });
            }
        }
        if let Some((pos, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(CoreError::Validation {
                field: "rows".to_string(),
                reason: format!(
                    "row {} has {} values, expected {}",
                    pos,
                    row.len(),
                    columns.len()
                ),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Column names in result order
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Result rows
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows were returned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Map from column name to its position
    #[must_use]
    pub fn column_index(&self) -> HashMap<&str, usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect()
    }

    /// Keep at most `limit` rows (0 keeps everything)
    pub fn truncate(&mut self, limit: usize) {
        if limit > 0 {
            self.rows.truncate(limit);
        }
    }
}
