//! Catalog loading, selection and ordering.

use crate::query::{Category, QueryDef};
use graphsweep_core::Job;
use indexmap::IndexMap;
use std::path::Path;
use tracing::debug;

const BUILTIN_JSON: &str = include_str!("../data/builtin.json");

/// Inventory queries that always open a report, in this order
pub const BASELINE_IDS: [&str; 4] = [
    "ad-all-users-samaccountname",
    "ad-all-computers-fqdn",
    "ad-domain-admins",
    "ad-domain-controllers",
];

/// Catalog errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Two definitions share an id
    #[error("duplicate query id: {0}")]
    DuplicateId(String),

    /// A definition is missing a required field
    #[error("invalid query {id}: {reason}")]
    InvalidQuery {
        /// Query id
        id: String,
        /// What is wrong
        reason: String,
    },

    /// Category filter not recognized
    #[error("invalid category {0:?} (expected: all|AD|EntraID|INFO)")]
    InvalidCategory(String),

    /// Requested id not among the selected queries
    #[error("unknown query id: {0}")]
    UnknownId(String),

    /// Catalog file could not be read
    #[error("failed to read catalog {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Catalog JSON could not be decoded
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Category filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Every category that is otherwise included
    #[default]
    All,
    /// One category only
    Only(Category),
}

impl CategoryFilter {
    /// Parse `all`, `AD`, `EntraID` or `INFO`, ignoring case
    ///
    /// # Errors
    ///
    /// Returns error for any other value
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Category::parse(trimmed)
            .map(Self::Only)
            .ok_or_else(|| CatalogError::InvalidCategory(raw.to_string()))
    }

    fn admits(&self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(only) => *only == category,
        }
    }
}

/// Which queries a run should include
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Include informational queries
    pub include_info: bool,
    /// Include Entra ID queries
    pub include_entra: bool,
    /// Category filter applied after the include switches
    pub category: CategoryFilter,
    /// Run just this query
    pub id: Option<String>,
}

impl Selection {
    /// Include informational queries
    #[must_use]
    pub fn with_info(mut self, include: bool) -> Self {
        self.include_info = include;
        self
    }

    /// Include Entra ID queries
    #[must_use]
    pub fn with_entra(mut self, include: bool) -> Self {
        self.include_entra = include;
        self
    }

    /// Restrict to one category
    #[must_use]
    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    /// Restrict to one query id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Immutable set of query definitions, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    queries: IndexMap<String, QueryDef>,
}

impl Catalog {
    /// Build from definitions, rejecting duplicate ids and empty fields
    ///
    /// # Errors
    ///
    /// Returns error on duplicates or missing id/cypher
    pub fn from_defs(defs: Vec<QueryDef>) -> Result<Self, CatalogError> {
        let mut queries = IndexMap::with_capacity(defs.len());
        for def in defs {
            if def.id.trim().is_empty() {
                return Err(CatalogError::InvalidQuery {
                    id: def.title.clone(),
                    reason: "empty id".to_string(),
                });
            }
            if def.cypher.trim().is_empty() {
                return Err(CatalogError::InvalidQuery {
                    id: def.id.clone(),
                    reason: "empty cypher".to_string(),
                });
            }
            if queries.contains_key(&def.id) {
                return Err(CatalogError::DuplicateId(def.id));
            }
            queries.insert(def.id.clone(), def);
        }
        Ok(Self { queries })
    }

    /// The built-in BloodHound pack
    ///
    /// # Errors
    ///
    /// Returns error if the embedded pack does not decode
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_JSON)
    }

    /// Decode a JSON array of definitions
    ///
    /// # Errors
    ///
    /// Returns error on malformed JSON or invalid definitions
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let defs: Vec<QueryDef> = serde_json::from_str(json)?;
        Self::from_defs(defs)
    }

    /// Load a JSON catalog file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or decoded
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json_str(&json)?;
        debug!(path = %path.display(), queries = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    /// Look up a definition
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&QueryDef> {
        self.queries.get(id)
    }

    /// Number of definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// True when the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Definitions in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &QueryDef> {
        self.queries.values()
    }

    /// Apply a selection and return the queries in tab order.
    ///
    /// Informational and Entra ID queries are dropped unless included, then
    /// the category filter applies, then ordering. A requested id must be
    /// among what remains.
    ///
    /// # Errors
    ///
    /// Returns error if the requested id is not selected
    pub fn select(&self, selection: &Selection) -> Result<Vec<QueryDef>, CatalogError> {
        let candidates: Vec<QueryDef> = self
            .iter()
            .filter(|q| selection.include_info || q.category != Category::Info)
            .filter(|q| selection.include_entra || q.category != Category::EntraId)
            .filter(|q| selection.category.admits(q.category))
            .cloned()
            .collect();
        let ordered = order(candidates);

        match &selection.id {
            Some(id) => ordered
                .into_iter()
                .find(|q| &q.id == id)
                .map(|q| vec![q])
                .ok_or_else(|| CatalogError::UnknownId(id.clone())),
            None => Ok(ordered),
        }
    }

    /// Turn selected queries into jobs with dense indices `0..n`
    #[must_use]
    pub fn jobs(queries: &[QueryDef]) -> Vec<Job> {
        queries
            .iter()
            .enumerate()
            .map(|(index, q)| Job::new(index, q.id.clone(), q.sheet_name.clone(), q.cypher.clone()))
            .collect()
    }
}

/// Tab ordering: baseline inventory queries first in their fixed order,
/// then AD, Entra ID and informational queries, each keeping input order
#[must_use]
pub fn order(mut queries: Vec<QueryDef>) -> Vec<QueryDef> {
    queries.sort_by_key(|q| {
        match BASELINE_IDS.iter().position(|id| *id == q.id) {
            Some(pos) => (0, pos as u8),
            None => (1, q.category.rank()),
        }
    });
    queries
}
