//! # Test Driver Errors
//!
//! Error types shared across the DocStore test driver workspace, one enum
//! per concern:
//! - [`ClientError`] for the HTTP document-store client
//! - [`EmbeddedError`] for the embedded server launcher
//! - [`DriverError`] for the test driver surface itself

use thiserror::Error;

/// Errors produced by the document-store client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Document store is not initialized: call initialize() first")]
    NotInitialized,

    #[error("Invalid document store state: {reason}")]
    InvalidState { reason: String },

    #[error("Document store is closed")]
    StoreClosed,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database does not exist: {database}")]
    DatabaseDoesNotExist { database: String },

    #[error("Server returned {status}: {details}")]
    ServerError { status: u16, details: String },
}

/// Errors produced while launching or stopping the embedded server process.
#[derive(Debug, Error)]
pub enum EmbeddedError {
    #[error("Server binary not found: {hint}")]
    BinaryNotFound { hint: String },

    #[error("Failed to spawn server binary {binary}: {source}")]
    SpawnFailed {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server did not report a listen URL within {seconds}s")]
    StartupTimeout { seconds: u64 },

    #[error("Server process exited during startup: {details}")]
    ServerExited { details: String },

    #[error("Server has not been started")]
    NotStarted,

    #[error("Server has already been started")]
    AlreadyStarted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the test driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Unable to start server: {reason}")]
    UnableToStartServer { reason: String },

    #[error(
        "Cannot configure the server after it was started. \
         Call configure_server before the first get_document_store call."
    )]
    ConfiguredTooLate,

    #[error("The indexes stayed stale for more than {seconds} seconds. {details}")]
    IndexesStaleTimeout { seconds: u64, details: String },

    #[error("Failed to close {} document store(s): {:?}", .failures.len(), .failures)]
    StoreCloseFailed { failures: Vec<String> },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Embedded(#[from] EmbeddedError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_stale_timeout_mentions_timeout_and_details() {
        let err = DriverError::IndexesStaleTimeout {
            seconds: 60,
            details: "Index people/byName (1 errors)".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("60 seconds"));
        assert!(text.contains("people/byName"));
    }

    #[test]
    fn client_error_wraps_into_driver_error() {
        let err: DriverError = ClientError::DatabaseDoesNotExist {
            database: "test_1".to_string(),
        }
        .into();
        assert!(err.to_string().contains("test_1"));
    }
}
