use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of Actix Web workers when `http.workers` is not set.
pub const DEFAULT_WORKERS: usize = 4;

/// Paper build fetched by the Minecraft template unless overridden.
pub const DEFAULT_MINECRAFT_DOWNLOAD_URL: &str = "https://fill-data.papermc.io/v1/objects/cabed3ae77cf55deba7c7d8722bc9cfd5e991201c211665f9265616d9fe5c77b/paper-1.20.4-499.jar";

/// Settings for the Minecraft server template.
///
/// # Examples
///
/// ```
/// use game_runner::config::MinecraftConfig;
///
/// let config = MinecraftConfig {
///     java_command: "/usr/lib/jvm/java-17/bin/java".to_string(),
///     ..MinecraftConfig::default()
/// };
/// assert_eq!(config.stop_timeout_secs, 15);
/// assert_eq!(config.default_port, 25565);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MinecraftConfig {
    /// URL of the server jar downloaded on install.
    pub download_url: String,

    /// Java launcher. An absolute path or a command available in the PATH.
    pub java_command: String,

    /// How long a graceful `stop` may take before the process is killed.
    pub stop_timeout_secs: u64,

    /// Port written to `server.properties` when the create request names none.
    pub default_port: u16,
}

impl Default for MinecraftConfig {
    fn default() -> Self {
        Self {
            download_url: DEFAULT_MINECRAFT_DOWNLOAD_URL.to_string(),
            java_command: "java".to_string(),
            stop_timeout_secs: 15,
            default_port: 25565,
        }
    }
}

impl MinecraftConfig {
    /// Graceful stop window as a [`Duration`].
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

/// Bearer token authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BearerAuthConfig {
    /// Token clients must present as `Authorization: Bearer <token>`.
    pub token: String,
}

/// Authentication settings for the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Bearer token authentication. `None` disables authentication.
    pub bearer: Option<BearerAuthConfig>,
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpConfig {
    /// Address to bind to.
    pub address: String,

    /// Port to listen on.
    pub port: u16,

    /// Number of Actix Web workers. Defaults to [`DEFAULT_WORKERS`].
    pub workers: Option<usize>,

    /// Authentication settings.
    pub authenticate: Option<AuthConfig>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            authenticate: None,
        }
    }
}

impl HttpConfig {
    /// The configured bearer token, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.authenticate
            .as_ref()
            .and_then(|auth| auth.bearer.as_ref())
            .map(|bearer| bearer.token.as_str())
    }
}

/// Main configuration for the Game Runner.
///
/// # JSON Schema
///
/// Every key is optional:
///
/// ```json
/// {
///   "serversDir": "servers",
///   "stateFile": "data/servers.json",
///   "reconcileIntervalSecs": 10,
///   "shutdownTimeoutSecs": 30,
///   "minecraft": {
///     "javaCommand": "java",
///     "stopTimeoutSecs": 15,
///     "defaultPort": 25565
///   },
///   "http": {
///     "address": "0.0.0.0",
///     "port": 8080,
///     "authenticate": { "bearer": { "token": "secret" } }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Parent directory of every instance directory.
    pub servers_dir: PathBuf,

    /// Location of the registry snapshot.
    pub state_file: PathBuf,

    /// Period of the reconciliation tick.
    pub reconcile_interval_secs: u64,

    /// Budget for waiting on the install worker during shutdown.
    pub shutdown_timeout_secs: u64,

    /// Minecraft template settings.
    pub minecraft: MinecraftConfig,

    /// HTTP API settings.
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            servers_dir: PathBuf::from("servers"),
            state_file: PathBuf::from("data").join("servers.json"),
            reconcile_interval_secs: 10,
            shutdown_timeout_secs: 30,
            minecraft: MinecraftConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Loads a configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be read
    /// * The file contents are not valid JSON
    /// * The JSON does not conform to the expected schema
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Reconciliation period as a [`Duration`].
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    /// Shutdown budget as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
