//! Options accepted by `get_document_store`.

use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct GetDocumentStoreOptions {
    /// Base database name; the driver appends the monotonic counter.
    /// Defaults to [`crate::DEFAULT_DATABASE_NAME`].
    pub database: Option<String>,
    /// When set, the driver waits for all indexes to settle before handing
    /// the store back.
    pub wait_for_indexing_timeout: Option<Duration>,
}

impl GetDocumentStoreOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            wait_for_indexing_timeout: Some(timeout),
            ..Self::default()
        }
    }

    pub fn for_database(database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..Self::default()
        }
    }
}
