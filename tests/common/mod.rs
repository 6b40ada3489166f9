// Shared helpers for the integration test crates: an in-memory template
// variant and a runner rooted in a temporary directory.
#![allow(dead_code)]

use async_trait::async_trait;
use game_runner::config::Config;
use game_runner::error::{Error, Result};
use game_runner::template::{
    ProcessSpec, ServerProcess, Template, TemplateBinding, TemplateBuilder, TemplateCatalog,
    TemplateInfo,
};
use game_runner::{GameRunner, ServerRecord, ServerStatus};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

pub const FAKE_TEMPLATE_TYPE: &str = "FakeServerTemplate";
pub const SHELL_TEMPLATE_TYPE: &str = "ShellServerTemplate";

/// One completed install, in completion order
#[derive(Debug, Clone)]
pub struct InstallSpan {
    pub dir: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Behavior shared by every fake template built from one builder
#[derive(Debug, Default)]
pub struct FakeBehavior {
    pub install_delay: Duration,
    /// How long a stop takes to complete
    pub stop_delay: Duration,
    /// Instance directory names whose install fails
    pub failing_dirs: HashSet<String>,
    pub installs: Mutex<Vec<InstallSpan>>,
    pub active_installs: AtomicUsize,
    pub max_active_installs: AtomicUsize,
    /// Instance directory names whose process died behind our back
    pub crashed: Mutex<HashSet<String>>,
}

impl FakeBehavior {
    pub fn with_delay(install_delay: Duration) -> Self {
        Self {
            install_delay,
            ..Self::default()
        }
    }

    pub fn with_stop_delay(stop_delay: Duration) -> Self {
        Self {
            stop_delay,
            ..Self::default()
        }
    }

    pub fn failing(mut self, dir: &str) -> Self {
        self.failing_dirs.insert(dir.to_string());
        self
    }

    pub fn crash(&self, dir: &str) {
        self.crashed.lock().unwrap().insert(dir.to_string());
    }

    pub fn install_order(&self) -> Vec<String> {
        self.installs.lock().unwrap().iter().map(|s| s.dir.clone()).collect()
    }
}

pub struct FakeBuilder {
    pub behavior: Arc<FakeBehavior>,
}

impl TemplateBuilder for FakeBuilder {
    fn type_tag(&self) -> &str {
        FAKE_TEMPLATE_TYPE
    }

    fn info(&self) -> TemplateInfo {
        TemplateInfo {
            name: "Fake".to_string(),
            version: "0.0.1".to_string(),
        }
    }

    fn default_ports(&self) -> Vec<u16> {
        vec![30000]
    }

    fn build(&self, binding: TemplateBinding) -> Arc<dyn Template> {
        Arc::new(FakeTemplate {
            binding,
            behavior: self.behavior.clone(),
            running: AtomicBool::new(false),
        })
    }
}

pub struct FakeTemplate {
    binding: TemplateBinding,
    behavior: Arc<FakeBehavior>,
    running: AtomicBool,
}

impl FakeTemplate {
    fn dir(&self) -> String {
        dir_of(&self.binding.path)
    }
}

fn dir_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl Template for FakeTemplate {
    fn type_tag(&self) -> &str {
        FAKE_TEMPLATE_TYPE
    }

    fn name(&self) -> &str {
        "Fake"
    }

    fn version(&self) -> &str {
        "0.0.1"
    }

    async fn install(&self) -> Result<()> {
        let active = self.behavior.active_installs.fetch_add(1, Ordering::SeqCst) + 1;
        self.behavior
            .max_active_installs
            .fetch_max(active, Ordering::SeqCst);

        let started = Instant::now();
        tokio::time::sleep(self.behavior.install_delay).await;
        let result = if self.behavior.failing_dirs.contains(&self.dir()) {
            Err(Error::Install("artifact download failed".to_string()))
        } else {
            tokio::fs::create_dir_all(&self.binding.path)
                .await
                .map_err(|e| Error::Install(e.to_string()))
        };
        let finished = Instant::now();

        self.behavior.active_installs.fetch_sub(1, Ordering::SeqCst);
        self.behavior.installs.lock().unwrap().push(InstallSpan {
            dir: self.dir(),
            started,
            finished,
        });
        result
    }

    async fn run(&self) -> Result<()> {
        self.behavior.crashed.lock().unwrap().remove(&self.dir());
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(self.behavior.stop_delay).await;
        }
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn uninstall(&self) -> Result<()> {
        self.stop().await?;
        match tokio::fs::remove_dir_all(&self.binding.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(Error::Uninstall(e.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && !self.behavior.crashed.lock().unwrap().contains(&self.dir())
    }
}

/// Builds templates that run `sh -c <script>` in the instance directory
pub struct ShellBuilder {
    pub script: String,
    pub stop_timeout: Duration,
}

impl TemplateBuilder for ShellBuilder {
    fn type_tag(&self) -> &str {
        SHELL_TEMPLATE_TYPE
    }

    fn info(&self) -> TemplateInfo {
        TemplateInfo {
            name: "Shell".to_string(),
            version: "1".to_string(),
        }
    }

    fn default_ports(&self) -> Vec<u16> {
        vec![30001]
    }

    fn build(&self, binding: TemplateBinding) -> Arc<dyn Template> {
        let process = ServerProcess::new(
            dir_of(&binding.path),
            ProcessSpec {
                command: "sh".to_string(),
                args: vec!["-c".to_string(), self.script.clone()],
                working_dir: binding.path.clone(),
                stop_command: "stop".to_string(),
                stop_timeout: self.stop_timeout,
            },
        );
        Arc::new(ShellTemplate { binding, process })
    }
}

/// A template backed by a real child process
pub struct ShellTemplate {
    binding: TemplateBinding,
    process: ServerProcess,
}

#[async_trait]
impl Template for ShellTemplate {
    fn type_tag(&self) -> &str {
        SHELL_TEMPLATE_TYPE
    }

    fn name(&self) -> &str {
        "Shell"
    }

    fn version(&self) -> &str {
        "1"
    }

    async fn install(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.binding.path)
            .await
            .map_err(|e| Error::Install(e.to_string()))
    }

    async fn run(&self) -> Result<()> {
        self.process.start().await
    }

    async fn stop(&self) -> Result<()> {
        self.process.stop().await
    }

    async fn uninstall(&self) -> Result<()> {
        self.stop().await?;
        match tokio::fs::remove_dir_all(&self.binding.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(Error::Uninstall(e.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn is_running(&self) -> bool {
        self.process.is_running()
    }
}

/// Configuration rooted in `dir`
pub fn test_config(dir: &Path) -> Config {
    Config {
        servers_dir: dir.join("servers"),
        state_file: dir.join("state").join("servers.json"),
        shutdown_timeout_secs: 5,
        ..Config::default()
    }
}

pub fn fake_catalog(behavior: Arc<FakeBehavior>) -> TemplateCatalog {
    TemplateCatalog::new().with_builder(Arc::new(FakeBuilder { behavior }))
}

/// A runner over fake templates in a fresh temporary directory
pub async fn fake_runner(behavior: Arc<FakeBehavior>) -> (GameRunner, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let runner = GameRunner::with_catalog(test_config(dir.path()), fake_catalog(behavior))
        .await
        .unwrap();
    (runner, dir)
}

/// Poll until `name` reaches `status`, panicking after a few seconds
pub async fn wait_for_status(runner: &GameRunner, name: &str, status: ServerStatus) -> ServerRecord {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let record = runner.get_server(name).await.unwrap();
        if record.status == status {
            return record;
        }
        assert!(
            Instant::now() < deadline,
            "{} stuck in {} waiting for {}",
            name,
            record.status,
            status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
