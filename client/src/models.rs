//! Wire models for the DocStore REST surface.
//!
//! The server is .NET-flavored and speaks PascalCase JSON; every struct here
//! carries a `rename_all = "PascalCase"` attribute so the Rust side stays
//! snake_case.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix the server gives to an index that is being rebuilt next to the
/// index it will replace. Replacement indexes stay stale until the swap and
/// are excluded from readiness checks.
pub const SIDE_BY_SIDE_INDEX_PREFIX: &str = "ReplacementOf/";

/// Payload for creating a database through the administrative channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseRecord {
    pub database_name: String,
    #[serde(default)]
    pub disabled: bool,
}

impl DatabaseRecord {
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            disabled: false,
        }
    }
}

/// Lifecycle state of a single index as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexState {
    Normal,
    Disabled,
    Idle,
    Error,
}

/// Per-index slice of the database statistics response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexInformation {
    pub name: String,
    pub state: IndexState,
    pub is_stale: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseStatistics {
    #[serde(default)]
    pub count_of_documents: u64,
    #[serde(default)]
    pub indexes: Vec<IndexInformation>,
}

/// One indexing failure recorded by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexingError {
    pub error: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

impl fmt::Display for IndexingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(document) = &self.document {
            write!(f, " (document: {document})")?;
        }
        Ok(())
    }
}

/// All recorded errors for one index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexErrors {
    pub name: String,
    #[serde(default)]
    pub errors: Vec<IndexingError>,
}
