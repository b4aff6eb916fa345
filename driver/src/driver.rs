//! The test driver: shared server lifecycle, store provisioning, teardown.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::OnceCell;

use client::{DatabaseRecord, DocumentStore, ServerOperations};
use embedded::{EmbeddedServer, ServerOptions, escape_single_arg};
use errors::{ClientError, DriverError};

use crate::options::GetDocumentStoreOptions;
use crate::{DEFAULT_DATABASE_NAME, Result};

/// One embedded server per test process, shared by every driver instance.
/// The child process is owned by the process lifetime; temp dirs are cleaned
/// by the exit hook registered when the options were built.
struct SharedServer {
    _server: Mutex<EmbeddedServer>,
    store: Arc<DocumentStore>,
    urls: Vec<String>,
}

static SHARED_SERVER: OnceCell<SharedServer> = OnceCell::const_new();
static GLOBAL_SERVER_OPTIONS: Mutex<Option<ServerOptions>> = Mutex::new(None);
static DATABASE_COUNTER: AtomicU64 = AtomicU64::new(0);
static EMPTY_SETTINGS_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Customization points for subclass-style fixtures. Both hooks default to
/// no-ops.
#[async_trait]
pub trait DriverHooks: Send + Sync {
    /// Runs after the store is constructed but before `initialize()`;
    /// adjust conventions here.
    async fn pre_initialize(&self, store: &mut DocumentStore) -> Result<()> {
        let _ = store;
        Ok(())
    }

    /// Runs once the store is initialized, before any indexing wait; seed
    /// data or deploy indexes here.
    async fn setup_database(&self, store: &DocumentStore) -> Result<()> {
        let _ = store;
        Ok(())
    }
}

struct NoopHooks;

#[async_trait]
impl DriverHooks for NoopHooks {}

type DriverClosedCallback = Box<dyn Fn(&TestDriver) + Send + Sync>;

pub struct TestDriver {
    disposed: AtomicBool,
    stores: Arc<DashMap<String, Arc<DocumentStore>>>,
    hooks: Box<dyn DriverHooks>,
    on_driver_closed: Mutex<Option<DriverClosedCallback>>,
}

impl Default for TestDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDriver {
    pub fn new() -> Self {
        Self::with_hooks(Box::new(NoopHooks))
    }

    pub fn with_hooks(hooks: Box<dyn DriverHooks>) -> Self {
        Self {
            disposed: AtomicBool::new(false),
            stores: Arc::new(DashMap::new()),
            hooks,
            on_driver_closed: Mutex::new(None),
        }
    }

    /// Register a callback invoked after this driver finishes closing.
    pub fn set_on_driver_closed<F>(&self, callback: F)
    where
        F: Fn(&TestDriver) + Send + Sync + 'static,
    {
        let mut guard = self
            .on_driver_closed
            .lock()
            .expect("on_driver_closed lock poisoned");
        *guard = Some(Box::new(callback));
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Override the options the shared server will be launched with. Must
    /// happen before the first `get_document_store` call in the process.
    pub fn configure_server(options: ServerOptions) -> Result<()> {
        if SHARED_SERVER.initialized() {
            return Err(DriverError::ConfiguredTooLate);
        }
        let mut guard = GLOBAL_SERVER_OPTIONS
            .lock()
            .expect("server options lock poisoned");
        *guard = Some(options);
        Ok(())
    }

    /// Options used when no global override was configured: defaults plus
    /// fresh temp data/log directories removed at process exit.
    pub fn default_server_options() -> Result<ServerOptions> {
        ServerOptions::with_temp_dirs().map_err(|e| DriverError::UnableToStartServer {
            reason: e.to_string(),
        })
    }

    /// Provision a database named `"test_{n}"` and return an initialized
    /// store bound to it.
    pub async fn get_document_store(&self) -> Result<Arc<DocumentStore>> {
        self.get_document_store_with(GetDocumentStoreOptions::default())
            .await
    }

    pub async fn get_document_store_with(
        &self,
        options: GetDocumentStoreOptions,
    ) -> Result<Arc<DocumentStore>> {
        let shared = Self::shared_server().await?;
        let server_ops = shared.store.server_operations()?;
        self.provision_store(&shared.urls, server_ops, options).await
    }

    /// Provisioning core against an explicit server; the public entry point
    /// resolves the shared server first.
    async fn provision_store(
        &self,
        urls: &[String],
        server_ops: ServerOperations,
        options: GetDocumentStoreOptions,
    ) -> Result<Arc<DocumentStore>> {
        let base = options.database.as_deref().unwrap_or(DEFAULT_DATABASE_NAME);
        let n = DATABASE_COUNTER.fetch_add(1, Ordering::SeqCst) + 1;
        let name = format!("{base}_{n}");

        server_ops
            .create_database(&DatabaseRecord::new(&name))
            .await?;
        tracing::info!("Provisioned database {name}");

        let mut store = DocumentStore::new(urls.to_vec(), Some(name.clone()));
        self.hooks.pre_initialize(&mut store).await?;
        store.initialize()?;
        let store = Arc::new(store);

        // Forget the store, then drop its database. The membership check
        // keeps the delete to exactly one even if the store is closed again
        // through another path.
        let tracked = Arc::clone(&self.stores);
        let delete_ops = server_ops.clone();
        let database = name.clone();
        store.add_after_close(move || async move {
            if tracked.remove(&database).is_none() {
                return Ok(());
            }
            match delete_ops.delete_database(&database, true).await {
                Ok(()) | Err(ClientError::DatabaseDoesNotExist { .. }) => Ok(()),
                Err(e) => Err(e),
            }
        });

        self.hooks.setup_database(&store).await?;

        if let Some(timeout) = options.wait_for_indexing_timeout {
            Self::wait_for_indexing(&store, None, Some(timeout)).await?;
        }

        self.stores.insert(name, Arc::clone(&store));
        Ok(store)
    }

    /// Close every store this driver created, collecting failures rather
    /// than stopping at the first one. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let snapshot: Vec<Arc<DocumentStore>> = self
            .stores
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut failures = Vec::new();
        for store in snapshot {
            if let Err(e) = store.close().await {
                failures.push(e.to_string());
            }
        }

        {
            let guard = self
                .on_driver_closed
                .lock()
                .expect("on_driver_closed lock poisoned");
            if let Some(callback) = guard.as_ref() {
                callback(self);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DriverError::StoreCloseFailed { failures })
        }
    }

    async fn shared_server() -> Result<&'static SharedServer> {
        SHARED_SERVER.get_or_try_init(Self::run_server).await
    }

    /// Boot the shared server: resolve options, inject the minimal settings
    /// file, launch, and bind a root store to the reported URL.
    async fn run_server() -> Result<SharedServer> {
        let options = Self::prepare_launch_options()
            .map_err(|reason| DriverError::UnableToStartServer { reason })?;

        let mut server = EmbeddedServer::new();
        server
            .start(&options)
            .await
            .map_err(|e| DriverError::UnableToStartServer {
                reason: e.to_string(),
            })?;
        let url = server.server_url()?.to_string();

        let mut store = DocumentStore::single_node(url.clone(), None);
        store.initialize()?;

        Ok(SharedServer {
            _server: Mutex::new(server),
            store: Arc::new(store),
            urls: vec![url],
        })
    }

    fn prepare_launch_options() -> std::result::Result<ServerOptions, String> {
        let override_options = {
            let mut guard = GLOBAL_SERVER_OPTIONS
                .lock()
                .map_err(|_| "server options lock poisoned".to_string())?;
            guard.take()
        };
        let mut options = match override_options {
            Some(options) => options,
            None => Self::default_server_options().map_err(|e| e.to_string())?,
        };

        let settings = empty_settings_file().map_err(|e| e.to_string())?;
        let mut args = vec![
            "-c".to_string(),
            escape_single_arg(&settings.to_string_lossy()),
        ];
        args.append(&mut options.command_line_args);
        options.command_line_args = args;
        Ok(options)
    }

    #[cfg(test)]
    pub(crate) fn force_shared_server_for_tests(url: &str) -> bool {
        let mut store = DocumentStore::single_node(url.to_string(), None);
        store.initialize().expect("root store init");
        SHARED_SERVER
            .set(SharedServer {
                _server: Mutex::new(EmbeddedServer::new()),
                store: Arc::new(store),
                urls: vec![url.trim_end_matches('/').to_string()],
            })
            .is_ok()
    }
}

/// One process-wide `{}` settings file, created on first need.
fn empty_settings_file() -> std::io::Result<PathBuf> {
    let mut guard = EMPTY_SETTINGS_FILE
        .lock()
        .map_err(|_| std::io::Error::other("settings file lock poisoned"))?;
    if let Some(path) = guard.as_ref() {
        return Ok(path.clone());
    }
    let mut file = tempfile::Builder::new()
        .prefix("settings-")
        .suffix(".json")
        .tempfile()?;
    file.write_all(b"{}")?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    *guard = Some(path.clone());
    Ok(path)
}
