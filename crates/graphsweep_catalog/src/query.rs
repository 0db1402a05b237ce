//! Query definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Query pack a definition belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Active Directory findings
    #[serde(rename = "AD")]
    Ad,
    /// Entra ID findings
    #[serde(rename = "EntraID")]
    EntraId,
    /// Informational inventory
    #[serde(rename = "INFO")]
    Info,
}

impl Category {
    /// Parse a category name, ignoring case
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "ad" => Some(Self::Ad),
            "entraid" => Some(Self::EntraId),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    /// Canonical name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ad => "AD",
            Self::EntraId => "EntraID",
            Self::Info => "INFO",
        }
    }

    /// Position in tab ordering
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Ad => 0,
            Self::EntraId => 1,
            Self::Info => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDef {
    /// Stable identifier
    pub id: String,
    /// Human-readable title
    pub title: String,
    /// Pack
    pub category: Category,
    /// Short name for report sections
    pub sheet_name: String,
    /// Declared output columns, display form
    #[serde(default)]
    pub headers: Vec<String>,
    /// What the query looks for
    #[serde(default)]
    pub description: String,
    /// Finding headline; empty for informational queries
    #[serde(default)]
    pub finding_title: String,
    /// Cypher text
    pub cypher: String,
}

impl QueryDef {
    /// Result column keys derived from the declared headers
    #[must_use]
    pub fn column_keys(&self) -> Vec<String> {
        self.headers.iter().map(|h| header_to_key(h)).collect()
    }

    /// Finding headline to show, if any
    #[must_use]
    pub fn finding(&self) -> Option<&str> {
        let title = self.finding_title.trim();
        (self.category != Category::Info && !title.is_empty()).then_some(title)
    }
}

/// Map a display header to the result column key it refers to
#[must_use]
pub fn header_to_key(header: &str) -> String {
    let h = header.trim().to_lowercase();
    let key = match h.as_str() {
        "hostname" | "computer" => "computer",
        "operating system" | "os" => "os",
        "user" | "username" => "user",
        "group names" | "group_names" | "group" => "group",
        "password set" | "password_set" => "pwdlastset",
        "service acct?" | "service_acct?" | "service acct" | "service_acct" => "service_acct",
        _ => return h.replace(' ', "_"),
    };
    key.to_string()
}
