//! graphsweep query catalog
//!
//! An immutable set of query definitions built once at startup and passed
//! explicitly to whatever needs it. The built-in pack covers Active
//! Directory findings, Entra ID findings and informational inventory
//! queries over a BloodHound graph.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod query;

pub use catalog::{BASELINE_IDS, Catalog, CatalogError, CategoryFilter, Selection, order};
pub use query::{Category, QueryDef, header_to_key};
