//! # DocStore Client
//!
//! A deliberately small HTTP client for the DocStore server, covering only
//! the surface integration tests need: document stores scoped to one
//! database, sessions with load/store/delete and a batched `save_changes`,
//! and the administrative operations used to provision and drop databases.
//!
//! The server's internals (indexing, storage, querying) are not modeled
//! here; this crate speaks to its REST surface and nothing more.

mod models;
mod operations;
mod session;
mod store;

pub use models::{
    DatabaseRecord, DatabaseStatistics, IndexErrors, IndexInformation, IndexState, IndexingError,
    SIDE_BY_SIDE_INDEX_PREFIX,
};
pub use operations::{MaintenanceOperations, ServerOperations};
pub use session::DocumentSession;
pub use store::{DocumentConventions, DocumentStore};

pub type Result<T> = std::result::Result<T, errors::ClientError>;
