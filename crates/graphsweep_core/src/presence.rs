//! Schema presence index.
//!
//! A snapshot of the node labels and relationship types the backend knows,
//! taken once per run and shared read-only by every admission check.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Raw inventory as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInventory {
    /// Node labels, original casing
    pub labels: Vec<String>,
    /// Relationship types, original casing
    pub relationship_types: Vec<String>,
}

impl SchemaInventory {
    /// Create an inventory, sorting both lists
    #[must_use]
    pub fn new(mut labels: Vec<String>, mut relationship_types: Vec<String>) -> Self {
        labels.sort();
        relationship_types.sort();
        Self {
            labels,
            relationship_types,
        }
    }
}

/// Lowercased lookup sets built from a [`SchemaInventory`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaPresence {
    labels: HashSet<String>,
    relationship_types: HashSet<String>,
}

impl SchemaPresence {
    /// Build from any label and relationship type names
    pub fn new<L, R>(labels: L, relationship_types: R) -> Self
    where
        L: IntoIterator,
        L::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        Self {
            labels: labels.into_iter().map(|l| l.as_ref().to_lowercase()).collect(),
            relationship_types: relationship_types
                .into_iter()
                .map(|r| r.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Build from a backend inventory
    #[must_use]
    pub fn from_inventory(inventory: &SchemaInventory) -> Self {
        Self::new(&inventory.labels, &inventory.relationship_types)
    }

    /// Case-insensitive label lookup
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(&label.to_lowercase())
    }

    /// Case-insensitive relationship type lookup
    #[must_use]
    pub fn has_relationship_type(&self, rel: &str) -> bool {
        self.relationship_types.contains(&rel.to_lowercase())
    }

    /// Number of known labels
    #[must_use]
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Number of known relationship types
    #[must_use]
    pub fn relationship_type_count(&self) -> usize {
        self.relationship_types.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_sorted() {
        let inv = SchemaInventory::new(
            vec!["User".to_string(), "Computer".to_string()],
            vec!["MemberOf".to_string(), "AdminTo".to_string()],
        );
        assert_eq!(inv.labels, vec!["Computer", "User"]);
        assert_eq!(inv.relationship_types, vec!["AdminTo", "MemberOf"]);
    }

    #[test]
    fn test_presence_case_insensitive() {
        let p = SchemaPresence::new(["User", "Computer"], ["MemberOf"]);
        assert!(p.has_label("user"));
        assert!(p.has_label("COMPUTER"));
        assert!(!p.has_label("AZUser"));
        assert!(p.has_relationship_type("memberof"));
        assert!(!p.has_relationship_type("AdminTo"));
    }

    #[test]
    fn test_presence_from_inventory() {
        let inv = SchemaInventory::new(vec!["Group".to_string()], vec![]);
        let p = SchemaPresence::from_inventory(&inv);
        assert_eq!(p.label_count(), 1);
        assert_eq!(p.relationship_type_count(), 0);
    }

    #[test]
    fn test_labels_and_relationship_types_are_separate() {
        let p = SchemaPresence::new(["MemberOf"], Vec::<String>::new());
        assert!(p.has_label("MemberOf"));
        assert!(!p.has_relationship_type("MemberOf"));
    }
}
