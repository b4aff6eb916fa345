//! Document store handle: URLs plus an optional database scope.
//!
//! A store is created un-initialized so callers can adjust conventions
//! first; `initialize` builds the HTTP client and freezes them. Stores are
//! closed at most once; after-close hooks run exactly once regardless of how
//! many times `close` is called.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use errors::ClientError;

use crate::Result;
use crate::operations::{MaintenanceOperations, ServerOperations};
use crate::session::DocumentSession;

/// Client-side knobs that must be settled before the store is initialized.
#[derive(Debug, Clone)]
pub struct DocumentConventions {
    pub request_timeout: Duration,
}

impl Default for DocumentConventions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

type AfterCloseHook =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send>;

pub struct DocumentStore {
    urls: Vec<String>,
    database: Option<String>,
    conventions: DocumentConventions,
    http: Option<reqwest::Client>,
    closed: AtomicBool,
    after_close: Mutex<Vec<AfterCloseHook>>,
}

impl DocumentStore {
    /// Create an un-initialized store for `urls`, optionally scoped to one
    /// database. Trailing slashes on URLs are stripped.
    pub fn new(urls: Vec<String>, database: Option<String>) -> Self {
        let urls = urls
            .into_iter()
            .map(|u| u.trim_end_matches('/').to_string())
            .collect();
        Self {
            urls,
            database,
            conventions: DocumentConventions::default(),
            http: None,
            closed: AtomicBool::new(false),
            after_close: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for a single-node store.
    pub fn single_node(url: impl Into<String>, database: Option<String>) -> Self {
        Self::new(vec![url.into()], database)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn conventions(&self) -> &DocumentConventions {
        &self.conventions
    }

    /// Mutable access to conventions; only valid before `initialize`.
    pub fn conventions_mut(&mut self) -> Result<&mut DocumentConventions> {
        if self.http.is_some() {
            return Err(ClientError::InvalidState {
                reason: "conventions cannot be changed after initialize()".to_string(),
            });
        }
        Ok(&mut self.conventions)
    }

    /// Build the HTTP client and make the store usable. Calling twice is an
    /// error, as is initializing a store with no URLs.
    pub fn initialize(&mut self) -> Result<()> {
        if self.http.is_some() {
            return Err(ClientError::InvalidState {
                reason: "document store is already initialized".to_string(),
            });
        }
        if self.urls.is_empty() {
            return Err(ClientError::InvalidState {
                reason: "document store requires at least one URL".to_string(),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(self.conventions.request_timeout)
            .build()?;
        self.http = Some(http);
        tracing::debug!(
            "Initialized document store for {:?} (database: {:?})",
            self.urls,
            self.database
        );
        Ok(())
    }

    fn http(&self) -> Result<&reqwest::Client> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::StoreClosed);
        }
        self.http.as_ref().ok_or(ClientError::NotInitialized)
    }

    fn first_url(&self) -> &str {
        &self.urls[0]
    }

    fn database_required(&self) -> Result<&str> {
        self.database.as_deref().ok_or_else(|| ClientError::InvalidState {
            reason: "no database is associated with this store".to_string(),
        })
    }

    /// Open a session against the store's database.
    pub fn open_session(&self) -> Result<DocumentSession> {
        let http = self.http()?.clone();
        let database = self.database_required()?.to_string();
        Ok(DocumentSession::new(
            http,
            self.first_url().to_string(),
            database,
        ))
    }

    /// Administrative channel (create/delete databases). Available on any
    /// initialized store, database-scoped or not.
    pub fn server_operations(&self) -> Result<ServerOperations> {
        Ok(ServerOperations::new(
            self.http()?.clone(),
            self.first_url().to_string(),
        ))
    }

    /// Maintenance channel scoped to the store's own database.
    pub fn maintenance(&self) -> Result<MaintenanceOperations> {
        let database = self.database_required()?.to_string();
        self.maintenance_for(&database)
    }

    /// Maintenance channel scoped to an explicit database.
    pub fn maintenance_for(&self, database: &str) -> Result<MaintenanceOperations> {
        Ok(MaintenanceOperations::new(
            self.http()?.clone(),
            self.first_url().to_string(),
            database.to_string(),
        ))
    }

    /// Register a hook to run when the store is closed. Hooks run in
    /// registration order, exactly once.
    pub fn add_after_close<F, Fut>(&self, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut hooks = self.after_close.lock().expect("after_close lock poisoned");
        hooks.push(Box::new(move || {
            let fut: Pin<Box<dyn Future<Output = Result<()>> + Send>> = Box::pin(hook());
            fut
        }));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the store. Idempotent: the second and later calls return
    /// immediately. All hooks run even if earlier ones fail; the first
    /// failure is returned.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let hooks: Vec<AfterCloseHook> = {
            let mut guard = self.after_close.lock().expect("after_close lock poisoned");
            std::mem::take(&mut *guard)
        };
        let mut first_failure = None;
        for hook in hooks {
            if let Err(e) = hook().await {
                tracing::warn!("after-close hook failed: {e}");
                first_failure.get_or_insert(e);
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("urls", &self.urls)
            .field("database", &self.database)
            .field("initialized", &self.http.is_some())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
