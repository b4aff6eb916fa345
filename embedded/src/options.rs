//! Launch options for the embedded server.

use std::path::PathBuf;
use std::time::Duration;

use errors::EmbeddedError;

use crate::Result;
use crate::cleanup::register_cleanup_at_exit;

/// Binary name looked up on `PATH` when nothing more specific is given.
pub const DEFAULT_SERVER_BINARY: &str = "docstore-server";

/// Environment variable pointing at the server binary, checked before the
/// `PATH` lookup.
pub const SERVER_PATH_ENV: &str = "DOCSTORE_SERVER_PATH";

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Explicit path to the server binary. When `None`, resolution falls
    /// back to [`SERVER_PATH_ENV`] and then a `PATH` lookup.
    pub server_binary: Option<PathBuf>,
    pub data_directory: Option<PathBuf>,
    pub logs_path: Option<PathBuf>,
    /// Address the server binds; port 0 lets the OS pick a free one and the
    /// real URL comes back through the startup handshake.
    pub bind_url: String,
    /// Extra arguments placed before the generated ones.
    pub command_line_args: Vec<String>,
    pub max_startup_duration: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            server_binary: None,
            data_directory: None,
            logs_path: None,
            bind_url: "http://127.0.0.1:0".to_string(),
            command_line_args: Vec::new(),
            max_startup_duration: Duration::from_secs(60),
        }
    }
}

impl ServerOptions {
    /// Default options pointed at fresh temp data/log directories whose
    /// removal is registered to run at process exit.
    pub fn with_temp_dirs() -> std::io::Result<Self> {
        let data_dir = tempfile::Builder::new()
            .prefix("docstore-data-")
            .tempdir()?
            .into_path();
        let logs_dir = tempfile::Builder::new()
            .prefix("docstore-logs-")
            .tempdir()?
            .into_path();
        register_cleanup_at_exit([&data_dir, &logs_dir]);
        tracing::debug!(
            "Allocated server temp directories: data {:?}, logs {:?}",
            data_dir,
            logs_dir
        );
        Ok(Self {
            data_directory: Some(data_dir),
            logs_path: Some(logs_dir),
            ..Self::default()
        })
    }

    /// Resolve the server binary to launch.
    pub fn resolve_binary(&self) -> Result<PathBuf> {
        if let Some(path) = &self.server_binary {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(EmbeddedError::BinaryNotFound {
                hint: format!("configured path {} does not exist", path.display()),
            });
        }

        if let Ok(env_path) = std::env::var(SERVER_PATH_ENV) {
            let path = PathBuf::from(env_path);
            if path.exists() {
                return Ok(path);
            }
            return Err(EmbeddedError::BinaryNotFound {
                hint: format!(
                    "{SERVER_PATH_ENV} points at {} which does not exist",
                    path.display()
                ),
            });
        }

        which::which(DEFAULT_SERVER_BINARY).map_err(|_| EmbeddedError::BinaryNotFound {
            hint: format!("set {SERVER_PATH_ENV} or put {DEFAULT_SERVER_BINARY} on PATH"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_to_an_ephemeral_port() {
        let options = ServerOptions::default();
        assert_eq!(options.bind_url, "http://127.0.0.1:0");
        assert_eq!(options.max_startup_duration, Duration::from_secs(60));
        assert!(options.command_line_args.is_empty());
    }

    #[test]
    fn with_temp_dirs_allocates_distinct_directories() {
        let options = ServerOptions::with_temp_dirs().unwrap();
        let data = options.data_directory.unwrap();
        let logs = options.logs_path.unwrap();
        assert!(data.exists());
        assert!(logs.exists());
        assert_ne!(data, logs);
        crate::cleanup::cleanup_temp_dirs([&data, &logs]);
    }

    #[test]
    fn explicit_missing_binary_is_reported() {
        let options = ServerOptions {
            server_binary: Some(PathBuf::from("/nonexistent/docstore-server")),
            ..ServerOptions::default()
        };
        let err = options.resolve_binary().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/docstore-server"));
    }
}
