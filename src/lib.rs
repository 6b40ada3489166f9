/*!
 # Game Runner

 A Rust library and service for provisioning, launching, supervising and
 tearing down game server processes on behalf of a management panel.

 ## Overview

 Game Runner provides functionality to:
 - Turn a "create server" request into an installed instance directory,
   asynchronously, through a single background install worker
 - Start servers as child processes and stop them gracefully, escalating to
   a kill when the server ignores its stop command
 - Keep a persisted registry of managed servers that survives restarts of
   the orchestrator, with statuses reconciled against live processes
 - Expose all of it over a small authenticated JSON HTTP API

 ## Basic Usage

 ```no_run
 use game_runner::{CreateServerRequest, GameRunner, Result};
 use game_runner::config::Config;

 #[tokio::main]
 async fn main() -> Result<()> {
     let runner = GameRunner::load(Config::default()).await?;

     // Accepted immediately; installation continues in the background
     let record = runner
         .create_server(CreateServerRequest::new("alpha", 1024))
         .await?;
     println!("{} is {}", record.name, record.status);

     // Once the install worker has finished
     runner.start_server("alpha").await?;
     runner.stop_server("alpha").await?;
     runner.uninstall_server("alpha").await?;

     runner.shutdown().await
 }
 ```

 ## Features

 - **Server Registry**: Case-insensitive unique names, one instance directory per server
 - **Install Queue**: Strict FIFO, never more than one install at a time
 - **Graceful Stop**: Console stop command, bounded wait, forced kill fallback
 - **Persistence**: Whole-document JSON snapshot, template handles rebuilt on load
 - **Reconciliation**: Periodic correction of statuses that drifted from reality
 - **HTTP API**: Actix Web with bearer token authentication and CORS

 ## License

 This project is licensed under the terms in the LICENSE file.
*/

pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod server;
pub mod template;

pub use config::Config;
pub use error::{Error, Result};
pub use server::{ServerRecord, ServerStatus};
pub use template::{Template, TemplateCatalog, TemplateInfo};

use jobs::JobQueue;
use serde::{Deserialize, Serialize};
use server::{
    Reconciler, RegistryStore, ServerLifecycleEvent, ServerRegistry, SharedRegistry,
    StatusCorrection, instance_dir_name,
};
use std::collections::HashMap;
use std::sync::Arc;
use template::TemplateBinding;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Body of a create-server request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServerRequest {
    /// Unique server name
    pub server_name: Option<String>,
    /// Memory ceiling in megabytes
    #[serde(rename = "maxRamMB")]
    pub max_ram_mb: Option<u32>,
    /// Ports; the template's default applies when empty
    #[serde(default)]
    pub allowed_ports: Option<Vec<u16>>,
    /// Template variant; the catalog's default applies when absent
    #[serde(default)]
    pub template_type: Option<String>,
}

impl CreateServerRequest {
    /// Request for `name` with `max_ram_mb` and every optional field left out
    pub fn new(name: impl Into<String>, max_ram_mb: u32) -> Self {
        Self {
            server_name: Some(name.into()),
            max_ram_mb: Some(max_ram_mb),
            ..Self::default()
        }
    }
}

/// Lifecycle controller for managed game servers
///
/// This struct is the main entry point: it owns the registry, the install
/// queue and the reconciler, and every create/start/stop/uninstall goes
/// through it. It is cheap to clone; clones share the same state.
/// All public methods are instrumented with `tracing` spans.
#[derive(Clone)]
pub struct GameRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    /// Configuration
    config: Config,
    /// Template variants by type tag
    catalog: TemplateCatalog,
    /// Managed server records
    registry: SharedRegistry,
    /// Per-server locks serializing start, stop and uninstall, keyed by
    /// lowercased name
    operations: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Install queue
    jobs: JobQueue,
    /// Periodic drift correction
    reconciler: std::sync::Mutex<Reconciler>,
}

impl GameRunner {
    /// Load the registry snapshot and start the install worker, using the
    /// built-in template variants
    pub async fn load(config: Config) -> Result<Self> {
        let catalog = TemplateCatalog::from_config(&config);
        Self::with_catalog(config, catalog).await
    }

    /// Load the registry snapshot and start the install worker
    ///
    /// Template handles are rebuilt from `catalog`, then one reconciliation
    /// pass runs so statuses persisted as `running` by a previous run are
    /// corrected. Records still `installing` lost their job with the
    /// previous run; they are moved to `error` so they can be uninstalled
    /// and re-created.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(config, catalog), fields(state_file = %config.state_file.display()))]
    pub async fn with_catalog(config: Config, catalog: TemplateCatalog) -> Result<Self> {
        let store = RegistryStore::new(config.state_file.clone());
        let mut registry = ServerRegistry::load(store, &catalog).await?;

        let corrections = server::reconcile(&mut registry);
        if !corrections.is_empty() {
            tracing::info!(num_corrections = corrections.len(), "Corrected statuses from the previous run");
        }

        let mut orphaned = 0;
        for record in registry.records_mut() {
            if record.status == ServerStatus::Installing {
                record.status = record.status.apply(ServerLifecycleEvent::InstallFailed)?;
                orphaned += 1;
                tracing::warn!(
                    server_name = %record.name,
                    "Server was installing when the previous run ended; marked as error, uninstall and re-create it to retry"
                );
            }
        }
        if orphaned > 0 {
            registry.persist().await?;
        }

        let registry: SharedRegistry = Arc::new(Mutex::new(registry));
        let jobs = JobQueue::start(registry.clone());
        let reconciler = Reconciler::new(registry.clone(), config.reconcile_interval());

        Ok(Self {
            inner: Arc::new(RunnerInner {
                config,
                catalog,
                registry,
                operations: std::sync::Mutex::new(HashMap::new()),
                jobs,
                reconciler: std::sync::Mutex::new(reconciler),
            }),
        })
    }

    /// The configuration this runner was built with
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The registered template variants
    pub fn catalog(&self) -> &TemplateCatalog {
        &self.inner.catalog
    }

    /// Create a server
    ///
    /// Validates the request, appends a record in `installing` status,
    /// persists the registry and queues the install. Returns as soon as the
    /// job is queued; install failures show up later as the `error` status.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self, request), fields(server_name = ?request.server_name))]
    pub async fn create_server(&self, request: CreateServerRequest) -> Result<ServerRecord> {
        let name = request
            .server_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Validation("serverName is required".to_string()))?
            .to_string();

        let max_ram_mb = request
            .max_ram_mb
            .filter(|ram| *ram > 0)
            .ok_or_else(|| Error::Validation("maxRamMB must be a positive integer".to_string()))?;

        let ports = request.allowed_ports.unwrap_or_default();
        if ports.contains(&0) {
            return Err(Error::Validation("allowedPorts must not contain 0".to_string()));
        }

        let template_type = match request.template_type.as_deref() {
            Some(tag) => tag.to_string(),
            None => self
                .inner
                .catalog
                .default_tag()
                .ok_or_else(|| Error::ConfigInvalid("no server templates are registered".to_string()))?
                .to_string(),
        };
        let builder = self.inner.catalog.get(&template_type).ok_or_else(|| {
            Error::Validation(format!("unknown templateType '{}'", template_type))
        })?;

        let path = self.inner.config.servers_dir.join(instance_dir_name(&name)?);
        let ports = if ports.is_empty() {
            builder.default_ports()
        } else {
            ports
        };

        let template = builder.build(TemplateBinding {
            path: path.clone(),
            max_ram_mb,
            ports: ports.clone(),
        });

        let record = ServerRecord {
            name: name.clone(),
            template_type,
            path,
            max_ram_mb,
            version: template.version().to_string(),
            status: ServerStatus::Installing,
            ports,
            template: Some(template),
        };

        {
            let mut registry = self.inner.registry.lock().await;
            registry.insert(record.clone())?;

            if let Err(e) = registry.persist().await {
                tracing::error!(error = %e, "Failed to persist new server; rolling back");
                registry.remove(&name);
                return Err(e);
            }
        }

        if let Err(e) = self.inner.jobs.enqueue(&name) {
            tracing::error!(error = %e, "Failed to queue install");
            let mut registry = self.inner.registry.lock().await;
            if let Some(record) = registry.find_mut(&name) {
                record.status = ServerStatus::Error;
            }
            if let Err(e) = registry.persist().await {
                tracing::error!(error = %e, "Failed to persist install failure");
            }
        }

        tracing::info!(path = %record.path.display(), "Server accepted for installation");
        Ok(record)
    }

    /// Start a server
    ///
    /// Starting a running server leaves it running. Fails with
    /// [`Error::Conflict`] while the server is installing or after a failed
    /// install.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn start_server(&self, name: &str) -> Result<()> {
        let _operation = self.lock_server(name).await?;
        let template = self.prepare(name, ServerLifecycleEvent::Started).await?;

        template.run().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to start server");
            e
        })?;

        self.record_transition(name, ServerLifecycleEvent::Started).await;
        tracing::info!("Server started");
        Ok(())
    }

    /// Stop a server
    ///
    /// May block for the template's whole graceful stop window before the
    /// process is killed. Stopping a stopped server leaves it stopped.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn stop_server(&self, name: &str) -> Result<()> {
        let _operation = self.lock_server(name).await?;
        let template = self.prepare(name, ServerLifecycleEvent::Stopped).await?;

        if let Err(e) = template.stop().await {
            if template.is_running() {
                tracing::error!(error = %e, "Failed to stop server");
                return Err(e);
            }
            tracing::warn!(error = %e, "Stop reported an error but the process is gone");
        }

        self.record_transition(name, ServerLifecycleEvent::Stopped).await;
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Uninstall a server
    ///
    /// Stops the process, deletes the instance directory, removes the record
    /// and persists the registry, in that order.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(server_name = %name))]
    pub async fn uninstall_server(&self, name: &str) -> Result<()> {
        let _operation = self.lock_server(name).await?;

        let template = {
            let registry = self.inner.registry.lock().await;
            let record = registry.get(name)?;
            record.status.ensure_removable()?;
            record.template()?
        };

        template.uninstall().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to uninstall server");
            e
        })?;

        let mut registry = self.inner.registry.lock().await;
        registry.remove(name);
        registry.persist().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to persist registry after uninstall");
            e
        })?;

        tracing::info!("Server uninstalled");
        Ok(())
    }

    /// Snapshot of every managed server
    pub async fn list_servers(&self) -> Vec<ServerRecord> {
        self.inner.registry.lock().await.records().to_vec()
    }

    /// Snapshot of one managed server
    pub async fn get_server(&self, name: &str) -> Result<ServerRecord> {
        self.inner.registry.lock().await.get(name).cloned()
    }

    /// Display metadata of every template variant
    pub fn list_templates(&self) -> Vec<TemplateInfo> {
        self.inner.catalog.list()
    }

    /// Run one reconciliation pass now
    pub async fn reconcile(&self) -> Vec<StatusCorrection> {
        let mut registry = self.inner.registry.lock().await;
        server::reconcile(&mut registry)
    }

    /// Start the periodic reconciliation task
    pub fn start_reconciler(&self) -> Result<()> {
        self.inner
            .reconciler
            .lock()
            .map_err(|_| Error::Other("Failed to lock reconciler".to_string()))?
            .start()
    }

    /// Shut the orchestrator down
    ///
    /// Stops the reconciler, stops every running server, stops the install
    /// worker (waiting for an install in progress, within the configured
    /// budget) and writes the final snapshot. A failed final write is
    /// returned; it means the last known state may be lost.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down");

        if let Ok(mut reconciler) = self.inner.reconciler.lock() {
            reconciler.stop();
        }

        let running: Vec<(String, Arc<dyn Template>)> = {
            let registry = self.inner.registry.lock().await;
            registry
                .records()
                .iter()
                .filter(|r| r.status == ServerStatus::Running)
                .filter_map(|r| r.template.clone().map(|t| (r.name.clone(), t)))
                .collect()
        };

        for (name, template) in running {
            let _operation = match self.lock_server(&name).await {
                Ok(guard) => guard,
                Err(e) => {
                    tracing::error!(server_name = %name, error = %e, "Failed to stop server during shutdown");
                    continue;
                }
            };
            tracing::info!(server_name = %name, "Stopping server for shutdown");
            match template.stop().await {
                Ok(()) => {
                    let mut registry = self.inner.registry.lock().await;
                    if let Some(record) = registry.find_mut(&name) {
                        record.status = ServerStatus::Stopped;
                    }
                }
                Err(e) => {
                    tracing::error!(server_name = %name, error = %e, "Failed to stop server during shutdown");
                }
            }
        }

        if let Err(e) = self
            .inner
            .jobs
            .shutdown(self.inner.config.shutdown_timeout())
            .await
        {
            tracing::warn!(error = %e, "Install worker did not stop cleanly");
        }

        let registry = self.inner.registry.lock().await;
        registry.persist().await.map_err(|e| {
            tracing::error!(
                error = %e,
                path = %registry.store().path().display(),
                "Failed to write final registry snapshot; last known state may be lost"
            );
            e
        })?;

        tracing::info!("Shutdown complete");
        Ok(())
    }

    /// Wait for exclusive control of one server
    ///
    /// Operations on different servers do not block each other.
    async fn lock_server(&self, name: &str) -> Result<OwnedMutexGuard<()>> {
        let lock = self
            .inner
            .operations
            .lock()
            .map_err(|_| Error::Other("Failed to lock server operations".to_string()))?
            .entry(operation_key(name))
            .or_default()
            .clone();
        Ok(lock.lock_owned().await)
    }

    /// Look up `name`, check `event` is allowed and return its template
    async fn prepare(&self, name: &str, event: ServerLifecycleEvent) -> Result<Arc<dyn Template>> {
        let registry = self.inner.registry.lock().await;
        let record = registry.get(name)?;
        record.status.apply(event)?;
        record.template()
    }

    /// Apply `event` to the stored status and persist
    async fn record_transition(&self, name: &str, event: ServerLifecycleEvent) {
        let mut registry = self.inner.registry.lock().await;
        let Some(record) = registry.find_mut(name) else {
            return;
        };

        match record.status.apply(event) {
            Ok(next) => record.status = next,
            Err(e) => {
                tracing::warn!(error = %e, "Status changed underneath the operation");
                return;
            }
        }

        if let Err(e) = registry.persist().await {
            tracing::error!(error = %e, "Failed to persist status change");
        }
    }
}

fn operation_key(name: &str) -> String {
    name.trim().to_lowercase()
}
