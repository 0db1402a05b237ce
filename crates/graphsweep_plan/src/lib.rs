//! graphsweep admission planner
//!
//! Decides, before any job reaches the worker pool, which jobs reference only
//! schema elements the backend actually has. The check is a best-effort token
//! scan over the raw query text, not a query-language parser.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod admission;
pub mod scan;

pub use admission::{Admission, Plan, Planner, admit};
pub use scan::{SchemaToken, TokenKind, scan};
