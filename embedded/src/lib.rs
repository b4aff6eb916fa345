//! # Embedded Server Launcher
//!
//! Starts a DocStore server binary as a child process for integration
//! tests: resolves the binary, spawns it against temp data/log directories,
//! waits for the stdout readiness handshake, and cleans up after itself.
//!
//! The server product itself is an external artifact; this crate only
//! manages its process lifecycle.

mod cleanup;
mod escape;
mod options;
mod server;

pub use cleanup::{cleanup_temp_dirs, drain_registered_cleanup, register_cleanup_at_exit};
pub use escape::escape_single_arg;
pub use options::{DEFAULT_SERVER_BINARY, SERVER_PATH_ENV, ServerOptions};
pub use server::EmbeddedServer;

pub type Result<T> = std::result::Result<T, errors::EmbeddedError>;
