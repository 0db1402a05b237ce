//! Backend collaborator traits.
//!
//! The engine only ever reads: it opens one session per worker, runs query
//! text through it, and asks the backend once per run for its schema
//! inventory.

use async_trait::async_trait;
use graphsweep_core::{BackendError, ResultSet, SchemaInventory};
use std::time::Duration;
use tokio::time::Instant;

/// One query execution request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteRequest {
    /// Query text
    pub query: String,
    /// Maximum rows to return (0 = unlimited)
    pub row_limit: usize,
    /// Point in time after which the caller no longer waits
    pub deadline: Option<Instant>,
}

impl ExecuteRequest {
    /// Create a request without a row limit or deadline
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            row_limit: 0,
            deadline: None,
        }
    }

    /// Set the row limit
    #[must_use]
    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.row_limit = limit;
        self
    }

    /// Set the deadline
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Time left until the deadline, `None` when there is no deadline
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// A backend connection handle owned by exactly one worker
#[async_trait]
pub trait Session: Send {
    /// Execute a read query
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects or fails the query
    async fn execute(&mut self, request: &ExecuteRequest) -> Result<ResultSet, BackendError>;
}

/// Backend store the batch runs against
#[async_trait]
pub trait Backend: Send + Sync {
    /// Open a session against `database`
    ///
    /// # Errors
    ///
    /// Returns error if no handle can be opened
    async fn open(&self, database: &str) -> Result<Box<dyn Session>, BackendError>;

    /// List the node labels and relationship types present in `database`
    ///
    /// # Errors
    ///
    /// Returns error if the inventory queries fail
    async fn inventory(&self, database: &str) -> Result<SchemaInventory, BackendError>;
}
