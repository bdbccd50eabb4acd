use serde::{Deserialize, Serialize};
use std::fmt;

/// The two catalogs a fee definition refers to by name.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    TransactionType,
    Channel,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogKind::TransactionType => f.write_str("transaction type"),
            CatalogKind::Channel => f.write_str("channel"),
        }
    }
}

/// A transaction type or channel record. Identity: `code` within its catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub active: bool,
}

impl CatalogEntry {
    pub fn new(code: &str, description: Option<&str>) -> Self {
        CatalogEntry {
            code: code.to_string(),
            description: description.map(str::to_string),
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
