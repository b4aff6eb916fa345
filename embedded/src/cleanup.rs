//! Best-effort removal of server-allocated temp directories.
//!
//! Directories registered here are removed when the process exits (unix
//! `atexit`) or when the embedded server is stopped, whichever happens
//! first. Removal is diagnostic-only and must never fail the test run, so
//! every error is swallowed.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

const CLEANUP_ATTEMPTS: u32 = 30;
const CLEANUP_RETRY_DELAY: Duration = Duration::from_millis(200);

static CLEANUP_REGISTRY: OnceLock<Mutex<Vec<PathBuf>>> = OnceLock::new();

fn registry() -> &'static Mutex<Vec<PathBuf>> {
    CLEANUP_REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

/// Remove directories, retrying while the server may still be letting go of
/// file handles. Blocks the calling thread; intended for teardown paths and
/// the exit hook, not the async runtime.
pub fn cleanup_temp_dirs<I, P>(dirs: I)
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let dirs: Vec<PathBuf> = dirs.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
    for attempt in 0..CLEANUP_ATTEMPTS {
        let mut any_failure = false;
        for dir in &dirs {
            if dir.exists() {
                let _ = std::fs::remove_dir_all(dir);
                if dir.exists() {
                    any_failure = true;
                }
            }
        }
        if !any_failure {
            return;
        }
        if attempt + 1 < CLEANUP_ATTEMPTS {
            std::thread::sleep(CLEANUP_RETRY_DELAY);
        }
    }
    tracing::debug!("Some temp directories could not be removed: {dirs:?}");
}

/// Record directories for removal at process exit.
pub fn register_cleanup_at_exit<I, P>(dirs: I)
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    {
        let mut guard = registry().lock().expect("cleanup registry lock poisoned");
        guard.extend(dirs.into_iter().map(|p| p.as_ref().to_path_buf()));
    }
    ensure_exit_hook();
}

/// Remove everything registered so far. Also invoked by the exit hook.
pub fn drain_registered_cleanup() {
    let dirs: Vec<PathBuf> = {
        match registry().lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => return,
        }
    };
    if !dirs.is_empty() {
        cleanup_temp_dirs(dirs);
    }
}

#[cfg(unix)]
fn ensure_exit_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        extern "C" fn run_registered_cleanup() {
            drain_registered_cleanup();
        }
        // SAFETY: registering a no-argument handler; the handler only
        // touches process-global state that outlives main.
        unsafe {
            libc::atexit(run_registered_cleanup);
        }
    });
}

#[cfg(not(unix))]
fn ensure_exit_hook() {
    // No portable exit hook; drain_registered_cleanup runs on server stop.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_removes_nested_directories() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("data");
        std::fs::create_dir_all(dir.join("indexes")).unwrap();
        std::fs::write(dir.join("indexes").join("raft.log"), b"x").unwrap();

        cleanup_temp_dirs([&dir]);
        assert!(!dir.exists());
    }

    #[test]
    fn cleanup_tolerates_missing_directories() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("never-created");
        cleanup_temp_dirs([&missing]);
        assert!(!missing.exists());
    }

    #[test]
    fn drain_removes_registered_directories() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("logs");
        std::fs::create_dir_all(&dir).unwrap();

        register_cleanup_at_exit([&dir]);
        drain_registered_cleanup();
        assert!(!dir.exists());
    }
}
