//! HTTP backend and session.

use crate::config::Neo4jConfig;
use crate::query::with_row_limit;
use crate::wire::{CommitRequest, CommitResponse, StatementResult};
use async_trait::async_trait;
use graphsweep_core::{BackendError, ErrorClass, ResultSet, SchemaInventory};
use graphsweep_runtime::{Backend, ExecuteRequest, Session};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const LABELS_QUERY: &str = "CALL db.labels() YIELD label RETURN label";
const RELATIONSHIP_TYPES_QUERY: &str =
    "CALL db.relationshipTypes() YIELD relationshipType RETURN relationshipType";

/// Neo4j over the HTTP transactional API.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Neo4jBackend {
    client: Client,
    config: Arc<Neo4jConfig>,
}

impl Neo4jBackend {
    /// Create a backend with its own connection pool
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: Neo4jConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .user_agent(concat!("graphsweep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Connection settings
    #[must_use]
    pub fn config(&self) -> &Neo4jConfig {
        &self.config
    }
}

#[async_trait]
impl Backend for Neo4jBackend {
    async fn open(&self, database: &str) -> Result<Box<dyn Session>, BackendError> {
        debug!(database, endpoint = %self.config.endpoint, "opening session");
        Ok(Box::new(Neo4jSession {
            backend: self.clone(),
            database: database.to_string(),
        }))
    }

    async fn inventory(&self, database: &str) -> Result<SchemaInventory, BackendError> {
        let body = CommitRequest::many(&[LABELS_QUERY, RELATIONSHIP_TYPES_QUERY]);
        let response = commit(self, database, &body, self.config.request_timeout).await?;
        let mut results = response.results.into_iter();
        let labels = names(results.next().unwrap_or_default());
        let relationship_types = names(results.next().unwrap_or_default());
        Ok(SchemaInventory::new(labels, relationship_types))
    }
}

/// One worker's handle on a database
struct Neo4jSession {
    backend: Neo4jBackend,
    database: String,
}

#[async_trait]
impl Session for Neo4jSession {
    async fn execute(&mut self, request: &ExecuteRequest) -> Result<ResultSet, BackendError> {
        let timeout = match request.remaining() {
            Some(left) if left.is_zero() => {
                return Err(BackendError::new("request timed out before it was sent"));
            }
            Some(left) => left,
            None => self.backend.config.request_timeout,
        };

        let statement = with_row_limit(&request.query, request.row_limit);
        let body = CommitRequest::single(&statement);
        let response = commit(&self.backend, &self.database, &body, timeout).await?;

        let result = response.results.into_iter().next().unwrap_or_default();
        let rows = result.data.into_iter().map(|r| r.row).collect();
        let mut rs = ResultSet::try_new(result.columns, rows)
            .map_err(|e| BackendError::new(format!("malformed response: {}", e)))?;
        rs.truncate(request.row_limit);
        Ok(rs)
    }
}

async fn commit(
    backend: &Neo4jBackend,
    database: &str,
    body: &CommitRequest<'_>,
    timeout: Duration,
) -> Result<CommitResponse, BackendError> {
    let config = &backend.config;
    let url = config
        .commit_url(database)
        .map_err(|e| BackendError::new(e.to_string()))?;

    let response = backend
        .client
        .post(url)
        .basic_auth(&config.user, Some(config.password.expose_secret()))
        .header("access-mode", "READ")
        .timeout(timeout)
        .json(body)
        .send()
        .await
        .map_err(transport_error)?;

    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;
    let parsed: Option<CommitResponse> = serde_json::from_str(&text).ok();

    if let Some(err) = parsed.as_ref().and_then(|r| r.errors.first()) {
        let backend_err = BackendError::new(err.message.clone());
        return Err(if err.code.is_empty() {
            backend_err
        } else {
            backend_err.with_code(err.code.clone())
        });
    }
    if !status.is_success() {
        return Err(status_error(status, &text));
    }
    parsed.ok_or_else(|| BackendError::new("malformed response: body is not a transaction result"))
}

fn status_error(status: StatusCode, body: &str) -> BackendError {
    let snippet: String = body.trim().chars().take(200).collect();
    let message = if snippet.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, snippet)
    };
    let class = match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            ErrorClass::Transient
        }
        s if s.is_client_error() => ErrorClass::ClientError,
        _ => ErrorClass::DatabaseError,
    };
    BackendError::new(message).with_class(class)
}

/// Transport failures carry no classification; the message keeps the whole
/// source chain so the marker table can see the OS-level cause.
fn transport_error(err: reqwest::Error) -> BackendError {
    let mut message = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    };
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    BackendError::new(message)
}

fn names(result: StatementResult) -> Vec<String> {
    result
        .data
        .into_iter()
        .filter_map(|r| r.row.into_iter().next())
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect()
}
