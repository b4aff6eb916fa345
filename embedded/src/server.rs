//! Server process lifecycle: spawn, readiness handshake, stop.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;

use errors::EmbeddedError;

use crate::Result;
use crate::cleanup::drain_registered_cleanup;
use crate::options::ServerOptions;

/// Line prefix the server prints once it is accepting connections.
const READINESS_PREFIX: &str = "Server available on: ";

/// Handle to a launched server process. The child is killed when the handle
/// is dropped; temp-dir cleanup runs on [`EmbeddedServer::stop`] and at
/// process exit.
#[derive(Default)]
pub struct EmbeddedServer {
    child: Option<Child>,
    server_url: Option<String>,
}

impl EmbeddedServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.child.is_some()
    }

    /// Launch the server binary and wait until it is reachable.
    ///
    /// The server announces its real listen URL (the bind URL usually names
    /// port 0) on stdout; we read lines until that handshake appears, then
    /// probe the HTTP surface until it answers.
    pub async fn start(&mut self, options: &ServerOptions) -> Result<()> {
        if self.child.is_some() {
            return Err(EmbeddedError::AlreadyStarted);
        }

        let binary = options.resolve_binary()?;
        let mut command = Command::new(&binary);
        command
            .args(&options.command_line_args)
            .arg(format!("--ServerUrl={}", options.bind_url));
        if let Some(dir) = &options.data_directory {
            command.arg(format!("--DataDir={}", dir.display()));
        }
        if let Some(dir) = &options.logs_path {
            command.arg(format!("--Logs.Path={}", dir.display()));
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        tracing::info!("Starting embedded server: {}", binary.display());
        let mut child = command.spawn().map_err(|e| EmbeddedError::SpawnFailed {
            binary: binary.display().to_string(),
            source: e,
        })?;

        let stdout = child.stdout.take().ok_or_else(|| EmbeddedError::ServerExited {
            details: "stdout was not captured".to_string(),
        })?;
        let mut lines = BufReader::new(stdout).lines();

        let url = tokio::time::timeout(options.max_startup_duration, read_handshake(&mut lines))
            .await
            .map_err(|_| EmbeddedError::StartupTimeout {
                seconds: options.max_startup_duration.as_secs(),
            })??;

        // Keep draining stdout so the child never blocks on a full pipe.
        tokio::spawn(async move { while let Ok(Some(_)) = lines.next_line().await {} });

        wait_until_alive(&url, options.max_startup_duration).await?;
        tracing::info!("Embedded server started at {url}");

        self.child = Some(child);
        self.server_url = Some(url);
        Ok(())
    }

    /// URL the running server listens on.
    pub fn server_url(&self) -> Result<&str> {
        self.server_url.as_deref().ok_or(EmbeddedError::NotStarted)
    }

    /// Kill the server process and remove registered temp directories.
    /// Idempotent.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            self.server_url = None;
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill embedded server: {e}");
            }
            let _ = child.wait().await;
            tracing::info!("Embedded server stopped");
        }
        drain_registered_cleanup();
        Ok(())
    }
}

async fn read_handshake(lines: &mut Lines<BufReader<ChildStdout>>) -> Result<String> {
    loop {
        match lines.next_line().await? {
            Some(line) => {
                tracing::debug!("server stdout: {line}");
                if let Some(url) = line.strip_prefix(READINESS_PREFIX) {
                    return Ok(url.trim().trim_end_matches('/').to_string());
                }
            }
            None => {
                return Err(EmbeddedError::ServerExited {
                    details: "stdout closed before the listen URL was reported".to_string(),
                });
            }
        }
    }
}

/// Probe the server's aliveness endpoint until it answers 2xx.
async fn wait_until_alive(url: &str, budget: std::time::Duration) -> Result<()> {
    let client = reqwest::Client::new();
    let alive_url = format!("{url}/setup/alive");
    let attempts = (budget.as_millis() / 100).max(1) as usize;
    let strategy = FixedInterval::from_millis(100).take(attempts);

    Retry::spawn(strategy, || async {
        match client.get(&alive_url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(format!("aliveness probe returned {}", resp.status())),
            Err(e) => Err(format!("aliveness probe failed: {e}")),
        }
    })
    .await
    .map_err(|last| {
        tracing::warn!("Server never became reachable at {alive_url}: {last}");
        EmbeddedError::StartupTimeout {
            seconds: budget.as_secs(),
        }
    })
}
