//! Backend and per-job failure types.
//!
//! A [`JobError`] is a value stored in a job's outcome, never something the
//! engine returns out of a batch run.

use std::time::Duration;

/// Classification reported by the backend itself.
///
/// Neo4j status codes look like `Neo.<Classification>.<Category>.<Title>`;
/// the classification segment is what decides retry eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Likely to succeed if retried
    Transient,
    /// The request itself is wrong (syntax, auth, constraints)
    ClientError,
    /// The database failed internally
    DatabaseError,
    /// Some other classification string
    Other(String),
}

impl ErrorClass {
    /// Parse a bare classification name such as `TransientError`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "TransientError" => Self::Transient,
            "ClientError" => Self::ClientError,
            "DatabaseError" => Self::DatabaseError,
            other => Self::Other(other.to_string()),
        }
    }

    /// Extract the classification from a dotted status code.
    ///
    /// Returns `None` when the code has no classification segment.
    #[must_use]
    pub fn from_status_code(code: &str) -> Option<Self> {
        let mut parts = code.split('.');
        let _namespace = parts.next()?;
        parts.next().filter(|s| !s.is_empty()).map(Self::parse)
    }

    /// Whether this class marks the failure as retryable
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Error surfaced by a backend collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.render())]
pub struct BackendError {
    /// Backend status code, when one was reported
    pub code: Option<String>,
    /// Structured classification, when the backend exposes one
    pub class: Option<ErrorClass>,
    /// Human-readable message
    pub message: String,
}

impl BackendError {
    /// Create an unclassified error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            class: None,
            message: message.into(),
        }
    }

    /// Attach a status code; the classification is derived from it
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        self.class = ErrorClass::from_status_code(&code);
        self.code = Some(code);
        self
    }

    /// Attach an explicit classification
    #[must_use]
    pub fn with_class(mut self, class: ErrorClass) -> Self {
        self.class = Some(class);
        self
    }

    fn render(&self) -> String {
        match &self.code {
            Some(code) => format!("{}: {}", code, self.message),
            None => self.message.clone(),
        }
    }
}

/// Terminal failure of one job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// The backend rejected or failed the query
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// The per-job deadline elapsed
    #[error("query timed out after {after:?}")]
    Timeout {
        /// Configured per-job limit
        after: Duration,
    },

    /// The whole run was cancelled while this job was in flight
    #[error("run cancelled")]
    Cancelled,

    /// Bookkeeping failure inside the engine
    #[error("internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl JobError {
    /// True when the job hit its own deadline
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True when the run-level token fired
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The backend error, if this is one
    #[must_use]
    pub fn as_backend(&self) -> Option<&BackendError> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_from_status_code() {
        assert_eq!(
            ErrorClass::from_status_code("Neo.TransientError.General.DatabaseUnavailable"),
            Some(ErrorClass::Transient)
        );
        assert_eq!(
            ErrorClass::from_status_code("Neo.ClientError.Statement.SyntaxError"),
            Some(ErrorClass::ClientError)
        );
        assert_eq!(ErrorClass::from_status_code("Neo"), None);
        assert_eq!(ErrorClass::from_status_code(""), None);
    }

    #[test]
    fn test_backend_error_with_code() {
        let err = BackendError::new("database unavailable")
            .with_code("Neo.TransientError.General.DatabaseUnavailable");
        assert_eq!(err.class, Some(ErrorClass::Transient));
        assert_eq!(
            err.to_string(),
            "Neo.TransientError.General.DatabaseUnavailable: database unavailable"
        );
    }

    #[test]
    fn test_backend_error_plain_display() {
        let err = BackendError::new("connection refused");
        assert_eq!(err.to_string(), "connection refused");
        assert!(err.class.is_none());
    }

    #[test]
    fn test_job_error_kinds() {
        let timeout = JobError::Timeout { after: Duration::from_secs(30) };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_cancelled());
        assert_eq!(timeout.to_string(), "query timed out after 30s");

        let backend: JobError = BackendError::new("boom").into();
        assert!(backend.as_backend().is_some());
        assert!(!backend.is_timeout());

        assert!(JobError::Cancelled.is_cancelled());
    }
}
