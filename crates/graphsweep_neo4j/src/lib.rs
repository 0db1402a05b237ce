//! graphsweep Neo4j backend
//!
//! Talks to Neo4j over the HTTP transactional endpoint
//! (`POST /db/{database}/tx/commit`). Every request is sent in read access
//! mode; the engine never writes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod http;
pub mod query;
pub mod wire;

pub use config::{DEFAULT_HTTP_PORT, Neo4jConfig};
pub use http::Neo4jBackend;
pub use query::with_row_limit;
