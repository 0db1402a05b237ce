//! Connection settings.

use graphsweep_core::{CoreError, CoreResult};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Port of the Neo4j HTTP connector
pub const DEFAULT_HTTP_PORT: u16 = 7474;

/// How to reach and authenticate against Neo4j
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    /// Base URL of the HTTP connector
    pub endpoint: Url,
    /// User name for basic auth
    pub user: String,
    /// Password for basic auth
    pub password: SecretString,
    /// Upper bound for one HTTP request when the job has no deadline
    pub request_timeout: Duration,
}

impl Neo4jConfig {
    /// Create a config from an endpoint URL
    ///
    /// # Errors
    ///
    /// Returns error if `endpoint` is not an http(s) URL
    pub fn new(
        endpoint: &str,
        user: impl Into<String>,
        password: SecretString,
    ) -> CoreResult<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        Ok(Self {
            endpoint,
            user: user.into(),
            password,
            request_timeout: Duration::from_secs(120),
        })
    }

    /// Create a config for `host` on the default HTTP port
    ///
    /// # Errors
    ///
    /// Returns error if `host` does not form a valid URL
    pub fn for_host(
        host: &str,
        user: impl Into<String>,
        password: SecretString,
    ) -> CoreResult<Self> {
        Self::new(&format!("http://{}:{}", host, DEFAULT_HTTP_PORT), user, password)
    }

    /// Set the fallback request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// URL of the auto-commit endpoint for `database`
    ///
    /// # Errors
    ///
    /// Returns error if the database name cannot form a URL path
    pub fn commit_url(&self, database: &str) -> CoreResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| CoreError::InvalidOption {
                field: "endpoint".to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["db", database, "tx", "commit"]);
        Ok(url)
    }
}

fn parse_endpoint(raw: &str) -> CoreResult<Url> {
    // bolt:// and neo4j:// URIs point at the binary protocol; reuse their host
    let url = Url::parse(raw).map_err(|e| CoreError::InvalidOption {
        field: "endpoint".to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        "bolt" | "neo4j" | "bolt+s" | "neo4j+s" => {
            let host = url.host_str().ok_or_else(|| CoreError::InvalidOption {
                field: "endpoint".to_string(),
                reason: format!("{} has no host", raw),
            })?;
            let scheme = if url.scheme().ends_with("+s") { "https" } else { "http" };
            parse_endpoint(&format!("{}://{}:{}", scheme, host, DEFAULT_HTTP_PORT))
        }
        other => Err(CoreError::InvalidOption {
            field: "endpoint".to_string(),
            reason: format!("unsupported scheme {}", other),
        }),
    }
}
