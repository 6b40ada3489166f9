use crate::error::{Error, Result};
use crate::server::ServerStatus;
use crate::template::{Template, TemplateBinding};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// One managed server instance
///
/// Everything but `template` is persisted. The template handle is rebuilt
/// from `template_type`, `path`, `max_ram_mb` and `ports` when the registry
/// is loaded; it stays `None` when the type tag is unknown.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    /// Unique name, compared case-insensitively
    pub name: String,
    /// Tag of the template variant
    pub template_type: String,
    /// Instance directory, owned by this record alone
    pub path: PathBuf,
    /// Memory ceiling in megabytes
    #[serde(rename = "maxRamMB")]
    pub max_ram_mb: u32,
    /// Version reported by the template
    pub version: String,
    /// Lifecycle status
    pub status: ServerStatus,
    /// Network ports, primary first
    #[serde(default)]
    pub ports: Vec<u16>,
    /// Runtime-only template handle
    #[serde(skip)]
    pub template: Option<Arc<dyn Template>>,
}

impl ServerRecord {
    /// Whether `name` refers to this record
    pub fn matches(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }

    /// The values the template handle is bound to
    pub fn binding(&self) -> TemplateBinding {
        TemplateBinding {
            path: self.path.clone(),
            max_ram_mb: self.max_ram_mb,
            ports: self.ports.clone(),
        }
    }

    /// The template handle, or an error naming the unknown type tag
    pub fn template(&self) -> Result<Arc<dyn Template>> {
        self.template.clone().ok_or_else(|| {
            Error::UnsupportedTemplate(format!(
                "server '{}' uses unknown template type '{}'",
                self.name, self.template_type
            ))
        })
    }
}

impl fmt::Debug for ServerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerRecord")
            .field("name", &self.name)
            .field("template_type", &self.template_type)
            .field("path", &self.path)
            .field("max_ram_mb", &self.max_ram_mb)
            .field("version", &self.version)
            .field("status", &self.status)
            .field("ports", &self.ports)
            .field("template", &self.template.as_ref().map(|t| t.type_tag().to_string()))
            .finish()
    }
}

/// Directory name derived from a server name
///
/// Lowercase; every character other than an ASCII letter, digit, `-` or `_`
/// becomes `_`. Names without a single letter or digit are rejected.
///
/// ```
/// use game_runner::server::instance_dir_name;
///
/// assert_eq!(instance_dir_name("My Server").unwrap(), "my_server");
/// assert_eq!(instance_dir_name("../etc").unwrap(), "___etc");
/// assert!(instance_dir_name("  ").is_err());
/// ```
pub fn instance_dir_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if !trimmed.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::Validation(
            "serverName must contain at least one letter or digit".to_string(),
        ));
    }

    Ok(trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect())
}
