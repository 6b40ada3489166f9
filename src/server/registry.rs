use crate::error::{Error, Result};
use crate::server::ServerRecord;
use crate::template::TemplateCatalog;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Registry shared by the controller, the install worker and the reconciler
pub type SharedRegistry = Arc<Mutex<ServerRegistry>>;

/// Reads and writes the registry snapshot
///
/// The snapshot is a single JSON array of records, rewritten wholesale. A
/// write goes to a sibling temp file that is then renamed over the target,
/// so an interrupted write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every persisted record. A missing or blank file is an empty registry.
    pub async fn load(&self) -> Result<Vec<ServerRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Persistence(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            Error::Persistence(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    /// Replace the snapshot with `records`
    pub async fn save(&self, records: &[ServerRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| Error::Persistence(format!("Failed to serialize registry: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Persistence(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await.map_err(|e| {
            Error::Persistence(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            Error::Persistence(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(path = %self.path.display(), records = records.len(), "Registry persisted");
        Ok(())
    }
}

/// The managed server records
///
/// Names are unique ignoring case and every record owns its own instance
/// directory. Callers hold the [`SharedRegistry`] lock across any
/// find-then-mutate sequence.
#[derive(Debug)]
pub struct ServerRegistry {
    records: Vec<ServerRecord>,
    store: RegistryStore,
}

impl ServerRegistry {
    /// Create an empty registry
    pub fn new(store: RegistryStore) -> Self {
        Self {
            records: Vec::new(),
            store,
        }
    }

    /// Load the snapshot and rebuild every record's template handle
    ///
    /// A record whose type tag isn't in `catalog` is kept with no template.
    pub async fn load(store: RegistryStore, catalog: &TemplateCatalog) -> Result<Self> {
        let mut records = store.load().await?;

        for record in &mut records {
            record.template = catalog.build(&record.template_type, record.binding());
            if record.template.is_none() {
                tracing::warn!(
                    server_name = %record.name,
                    template_type = %record.template_type,
                    "Loaded server with unknown template type"
                );
            }
        }

        tracing::info!(path = %store.path().display(), num_servers = records.len(), "Loaded server registry");
        Ok(Self { records, store })
    }

    /// All records, in creation order
    pub fn records(&self) -> &[ServerRecord] {
        &self.records
    }

    /// Mutable access to all records
    pub fn records_mut(&mut self) -> &mut [ServerRecord] {
        &mut self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find a record by name, ignoring case
    pub fn find(&self, name: &str) -> Option<&ServerRecord> {
        self.records.iter().find(|r| r.matches(name))
    }

    /// Find a record by name, ignoring case
    pub fn find_mut(&mut self, name: &str) -> Option<&mut ServerRecord> {
        self.records.iter_mut().find(|r| r.matches(name))
    }

    /// Find a record by name or fail with [`Error::ServerNotFound`]
    pub fn get(&self, name: &str) -> Result<&ServerRecord> {
        self.find(name)
            .ok_or_else(|| Error::ServerNotFound(name.to_string()))
    }

    /// Append a record, enforcing unique names and instance directories
    pub fn insert(&mut self, record: ServerRecord) -> Result<()> {
        if self.find(&record.name).is_some() {
            return Err(Error::Conflict(format!(
                "a server named '{}' already exists",
                record.name
            )));
        }

        if let Some(owner) = self.records.iter().find(|r| r.path == record.path) {
            return Err(Error::Conflict(format!(
                "directory {} is already used by server '{}'",
                record.path.display(),
                owner.name
            )));
        }

        self.records.push(record);
        Ok(())
    }

    /// Remove a record by name, ignoring case
    pub fn remove(&mut self, name: &str) -> Option<ServerRecord> {
        let index = self.records.iter().position(|r| r.matches(name))?;
        Some(self.records.remove(index))
    }

    /// Write the snapshot
    pub async fn persist(&self) -> Result<()> {
        self.store.save(&self.records).await
    }

    /// The backing store
    pub fn store(&self) -> &RegistryStore {
        &self.store
    }
}
