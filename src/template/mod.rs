//! Server templates for Game Runner.
//!
//! A [`Template`] knows how to install, run, stop and uninstall one kind of
//! game server inside one instance directory. Templates are built by a
//! [`TemplateBuilder`] registered in a [`TemplateCatalog`] under a type tag;
//! the tag is what the registry persists, so the catalog is also what turns a
//! reloaded record back into a live template.
//!
//! # Components
//!
//! * `minecraft` - The Minecraft (Paper) server template
//! * `process` - Child process supervision shared by templates
//!
//! # Examples
//!
//! ```no_run
//! use game_runner::config::Config;
//! use game_runner::template::{TemplateBinding, TemplateCatalog, MINECRAFT_TEMPLATE_TYPE};
//!
//! # async fn example() -> game_runner::Result<()> {
//! let catalog = TemplateCatalog::from_config(&Config::default());
//! let binding = TemplateBinding {
//!     path: "servers/alpha".into(),
//!     max_ram_mb: 1024,
//!     ports: vec![25565],
//! };
//!
//! let template = catalog.build(MINECRAFT_TEMPLATE_TYPE, binding).unwrap();
//! template.install().await?;
//! template.run().await?;
//! # Ok(())
//! # }
//! ```
pub mod minecraft;
pub mod process;

pub use minecraft::{MINECRAFT_TEMPLATE_TYPE, MinecraftBuilder, MinecraftTemplate};
pub use process::{ProcessSpec, ServerProcess};

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Capabilities every server template exposes.
///
/// Implementations own whatever runtime state they need (the child process
/// handle in particular) behind interior mutability, so a template can be
/// shared as `Arc<dyn Template>` between the controller, the install worker
/// and the reconciler.
#[async_trait]
pub trait Template: Send + Sync {
    /// Persisted tag identifying this variant.
    fn type_tag(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Display version.
    fn version(&self) -> &str;

    /// Create the instance directory, fetch artifacts and write baseline
    /// configuration. Safe to call again on a partially installed directory.
    async fn install(&self) -> Result<()>;

    /// Launch the server process. No-op if it is already running.
    async fn run(&self) -> Result<()>;

    /// Stop the server process, gracefully first and forcefully if needed.
    /// No-op if it is not running.
    async fn stop(&self) -> Result<()>;

    /// Stop the process, then recursively remove the instance directory.
    async fn uninstall(&self) -> Result<()>;

    /// True iff a tracked process handle exists and has not exited.
    fn is_running(&self) -> bool;
}

/// The values a template is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBinding {
    /// Instance directory.
    pub path: PathBuf,
    /// Memory ceiling passed to the launcher.
    pub max_ram_mb: u32,
    /// Network ports; the first one is the primary port.
    pub ports: Vec<u16>,
}

/// Display metadata of a template variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    /// Display name
    pub name: String,
    /// Display version
    pub version: String,
}

/// Constructs bound templates of one variant.
pub trait TemplateBuilder: Send + Sync {
    /// Tag under which built templates are persisted.
    fn type_tag(&self) -> &str;

    /// Display metadata for `list-templates`.
    fn info(&self) -> TemplateInfo;

    /// Ports applied when a create request names none.
    fn default_ports(&self) -> Vec<u16>;

    /// Build a template bound to `binding`.
    fn build(&self, binding: TemplateBinding) -> Arc<dyn Template>;
}

/// Registered template variants, keyed by type tag.
///
/// The first registered builder is the default used by create requests that
/// don't name a template type.
#[derive(Clone, Default)]
pub struct TemplateCatalog {
    builders: Vec<Arc<dyn TemplateBuilder>>,
}

impl TemplateCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every built-in variant, configured from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new().with_builder(Arc::new(MinecraftBuilder::new(config.minecraft.clone())))
    }

    /// Register a builder. A builder with the same tag is replaced.
    pub fn with_builder(mut self, builder: Arc<dyn TemplateBuilder>) -> Self {
        self.builders.retain(|b| b.type_tag() != builder.type_tag());
        self.builders.push(builder);
        self
    }

    /// Look up the builder registered under `tag`.
    pub fn get(&self, tag: &str) -> Option<&Arc<dyn TemplateBuilder>> {
        self.builders.iter().find(|b| b.type_tag() == tag)
    }

    /// Tag of the default variant, if any builder is registered.
    pub fn default_tag(&self) -> Option<&str> {
        self.builders.first().map(|b| b.type_tag())
    }

    /// Build a template for `tag`, or `None` if the tag is unknown.
    pub fn build(&self, tag: &str, binding: TemplateBinding) -> Option<Arc<dyn Template>> {
        self.get(tag).map(|builder| builder.build(binding))
    }

    /// Metadata of every registered variant, in registration order.
    pub fn list(&self) -> Vec<TemplateInfo> {
        self.builders.iter().map(|b| b.info()).collect()
    }
}

impl std::fmt::Debug for TemplateCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.builders.iter().map(|b| b.type_tag()))
            .finish()
    }
}
