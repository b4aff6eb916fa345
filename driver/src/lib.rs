//! # DocStore Test Driver
//!
//! Reusable fixture for integration tests that need real database
//! semantics. The first test to ask for a store lazily boots one shared
//! embedded server for the whole test run; every call after that provisions
//! a uniquely named database on it and hands back an initialized
//! [`client::DocumentStore`]. Closing the driver closes the stores it
//! created and drops their databases.
//!
//! ```no_run
//! use driver::TestDriver;
//!
//! # async fn example() -> Result<(), errors::DriverError> {
//! let driver = TestDriver::new();
//! let store = driver.get_document_store().await?;
//! let mut session = store.open_session()?;
//! session.store(&serde_json::json!({ "name": "John" }), "people/1")?;
//! session.save_changes().await?;
//! driver.close().await?;
//! # Ok(())
//! # }
//! ```

mod debug_wait;
mod driver;
mod indexing;
mod options;

pub use driver::{DriverHooks, TestDriver};
pub use options::GetDocumentStoreOptions;

pub use client::DocumentStore;
pub use embedded::{ServerOptions, cleanup_temp_dirs};

pub type Result<T> = std::result::Result<T, errors::DriverError>;

/// Base name used when `get_document_store` is called without one.
pub const DEFAULT_DATABASE_NAME: &str = "test";
