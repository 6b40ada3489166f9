/// Server management module for Game Runner.
///
/// This module holds the managed server records, their lifecycle state
/// machine, the persisted registry and the reconciliation that keeps stored
/// statuses honest about live processes.
///
/// # Components
///
/// * `lifecycle` - Server statuses and the transitions between them
/// * `record` - The persisted record of one managed server
/// * `registry` - The record list and its JSON snapshot
/// * `reconcile` - Drift correction against observed process state
///
/// # Examples
///
/// Loading a registry and correcting drifted statuses:
///
/// ```no_run
/// use game_runner::config::Config;
/// use game_runner::server::{reconcile, RegistryStore, ServerRegistry};
/// use game_runner::template::TemplateCatalog;
///
/// # async fn example() -> game_runner::Result<()> {
/// let catalog = TemplateCatalog::from_config(&Config::default());
/// let store = RegistryStore::new("data/servers.json");
///
/// let mut registry = ServerRegistry::load(store, &catalog).await?;
/// for correction in reconcile(&mut registry) {
///     println!("{}: {} -> {}", correction.server_name, correction.from, correction.to);
/// }
/// # Ok(())
/// # }
/// ```
pub mod lifecycle;
pub mod reconcile;
mod record;
pub mod registry;

pub use lifecycle::{ServerLifecycleEvent, ServerStatus};
pub use reconcile::{Reconciler, StatusCorrection, reconcile};
pub use record::{ServerRecord, instance_dir_name};
pub use registry::{RegistryStore, ServerRegistry, SharedRegistry};
