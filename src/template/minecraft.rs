use crate::config::MinecraftConfig;
use crate::error::{Error, Result};
use crate::template::process::{ProcessSpec, ServerProcess};
use crate::template::{Template, TemplateBinding, TemplateBuilder, TemplateInfo};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Persisted type tag of the Minecraft template.
pub const MINECRAFT_TEMPLATE_TYPE: &str = "MinecraftServerTemplate";

const NAME: &str = "Minecraft Paper";
const VERSION: &str = "1.20.4";
const JAR_FILE: &str = "server.jar";
const EULA_FILE: &str = "eula.txt";
const PROPERTIES_FILE: &str = "server.properties";

/// Builds [`MinecraftTemplate`]s from the shared Minecraft settings.
pub struct MinecraftBuilder {
    config: MinecraftConfig,
    client: reqwest::Client,
}

impl MinecraftBuilder {
    /// Create a builder. One HTTP client is shared by every built template.
    pub fn new(config: MinecraftConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

impl TemplateBuilder for MinecraftBuilder {
    fn type_tag(&self) -> &str {
        MINECRAFT_TEMPLATE_TYPE
    }

    fn info(&self) -> TemplateInfo {
        TemplateInfo {
            name: NAME.to_string(),
            version: VERSION.to_string(),
        }
    }

    fn default_ports(&self) -> Vec<u16> {
        vec![self.config.default_port]
    }

    fn build(&self, mut binding: TemplateBinding) -> Arc<dyn Template> {
        if binding.ports.is_empty() {
            binding.ports = self.default_ports();
        }
        Arc::new(MinecraftTemplate::new(
            binding,
            self.config.clone(),
            self.client.clone(),
        ))
    }
}

/// A Paper server installed into one instance directory.
///
/// Install downloads the server jar, accepts the EULA and writes a minimal
/// `server.properties`; run launches the jar with `-Xmx` set from the
/// binding's memory ceiling; stop sends `stop` on the console.
pub struct MinecraftTemplate {
    binding: TemplateBinding,
    config: MinecraftConfig,
    client: reqwest::Client,
    process: ServerProcess,
}

impl MinecraftTemplate {
    /// Create a template bound to `binding`
    pub fn new(binding: TemplateBinding, config: MinecraftConfig, client: reqwest::Client) -> Self {
        let spec = ProcessSpec {
            command: config.java_command.clone(),
            args: vec![
                format!("-Xmx{}M", binding.max_ram_mb),
                "-Xms128M".to_string(),
                "-jar".to_string(),
                JAR_FILE.to_string(),
                "nogui".to_string(),
            ],
            working_dir: binding.path.clone(),
            stop_command: "stop".to_string(),
            stop_timeout: config.stop_timeout(),
        };
        let process = ServerProcess::new(display_name(&binding.path), spec);

        Self {
            binding,
            config,
            client,
            process,
        }
    }

    /// The supervised server process
    pub fn process(&self) -> &ServerProcess {
        &self.process
    }

    fn primary_port(&self) -> u16 {
        self.binding
            .ports
            .first()
            .copied()
            .unwrap_or(self.config.default_port)
    }

    /// Contents of the generated `server.properties`
    pub fn properties(&self) -> String {
        format!("server-port={}\nonline-mode=false\n", self.primary_port())
    }

    async fn download_server_jar(&self) -> Result<()> {
        let target = self.binding.path.join(JAR_FILE);
        let partial = self.binding.path.join(format!("{}.part", JAR_FILE));

        tracing::info!(url = %self.config.download_url, target = %target.display(), "Downloading server jar");

        let mut response = self
            .client
            .get(&self.config.download_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Install(format!("Failed to download server jar: {}", e)))?;

        let mut file = tokio::fs::File::create(&partial)
            .await
            .map_err(|e| install_io("create", &partial, e))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Install(format!("Failed to download server jar: {}", e)))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| install_io("write", &partial, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| install_io("flush", &partial, e))?;
        drop(file);

        tokio::fs::rename(&partial, &target)
            .await
            .map_err(|e| install_io("rename", &target, e))?;

        tracing::debug!(bytes = written, "Server jar downloaded");
        Ok(())
    }
}

#[async_trait]
impl Template for MinecraftTemplate {
    fn type_tag(&self) -> &str {
        MINECRAFT_TEMPLATE_TYPE
    }

    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> &str {
        VERSION
    }

    async fn install(&self) -> Result<()> {
        let path = &self.binding.path;
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| install_io("create", path, e))?;

        self.download_server_jar().await?;

        let eula = path.join(EULA_FILE);
        tokio::fs::write(&eula, "eula=true")
            .await
            .map_err(|e| install_io("write", &eula, e))?;

        let properties = path.join(PROPERTIES_FILE);
        tokio::fs::write(&properties, self.properties())
            .await
            .map_err(|e| install_io("write", &properties, e))?;

        tracing::info!(path = %path.display(), "Server {} ({}) has been installed", NAME, VERSION);
        Ok(())
    }

    async fn run(&self) -> Result<()> {
        self.process.start().await
    }

    async fn stop(&self) -> Result<()> {
        self.process.stop().await
    }

    async fn uninstall(&self) -> Result<()> {
        self.stop().await?;

        let path = &self.binding.path;
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::Uninstall(format!(
                    "Failed to remove {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        tracing::info!(path = %path.display(), "Server has been uninstalled");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.process.is_running()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn install_io(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Install(format!("Failed to {} {}: {}", action, path.display(), e))
}
