// src/template/process.rs
use crate::error::{Error, Result};
use async_process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use futures_lite::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use futures_lite::StreamExt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// How to launch and gracefully stop one server process
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    /// Program to execute
    pub command: String,
    /// Command-line arguments
    pub args: Vec<String>,
    /// Working directory of the child
    pub working_dir: PathBuf,
    /// Line written to stdin to request a graceful shutdown
    pub stop_command: String,
    /// How long to wait for a graceful exit before killing
    pub stop_timeout: Duration,
}

/// Interval between exit checks while a stop is in flight
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long a killed process may take to be reaped
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// A supervised server process
///
/// The child handle lives behind a std mutex that is only held for short,
/// non-awaiting sections. The handle stays in place until the process has
/// been reaped, so `is_running` keeps reporting a stopping process as alive.
/// Start and stop are serialized by a separate async lock.
pub struct ServerProcess {
    /// Name used in logs
    name: String,
    /// Launch settings
    spec: ProcessSpec,
    /// Child process
    child: Mutex<Option<Child>>,
    /// Held for the whole of a start or stop
    op: tokio::sync::Mutex<()>,
}

impl ServerProcess {
    /// Create a new, not yet started, server process
    pub fn new(name: impl Into<String>, spec: ProcessSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            child: Mutex::new(None),
            op: tokio::sync::Mutex::new(()),
        }
    }

    /// Get the process name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the launch settings
    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    /// OS process id of the tracked child, if one is running
    pub fn pid(&self) -> Option<u32> {
        let mut guard = self.child.lock().ok()?;
        let child = guard.as_mut()?;
        if matches!(child.try_status(), Ok(None)) {
            Some(child.id())
        } else {
            None
        }
    }

    /// True iff a tracked child exists and has not exited
    pub fn is_running(&self) -> bool {
        self.pid().is_some()
    }

    /// Start the process
    ///
    /// Does nothing if the process is already running. A handle left over
    /// from a process that exited on its own is released first. Waits for
    /// an in-flight stop to finish.
    pub async fn start(&self) -> Result<()> {
        let _op = self.op.lock().await;
        let mut guard = self.lock_child()?;

        if let Some(child) = guard.as_mut() {
            if matches!(child.try_status(), Ok(None)) {
                tracing::debug!(server = %self.name, pid = child.id(), "Process already running");
                return Ok(());
            }
        }
        guard.take();

        let mut command = Command::new(&self.spec.command);
        command
            .args(&self.spec.args)
            .current_dir(&self.spec.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            Error::ProcessControl(format!(
                "Failed to start '{}' for server '{}': {}",
                self.spec.command, self.name, e
            ))
        })?;

        if let Some(stdout) = child.stdout.take() {
            spawn_stdout_drain(self.name.clone(), stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_drain(self.name.clone(), stderr);
        }

        tracing::info!(server = %self.name, pid = child.id(), "Server process started");
        *guard = Some(child);

        Ok(())
    }

    /// Stop the process
    ///
    /// Writes the stop command to stdin and waits up to the stop timeout for
    /// the process to exit. If writing fails or the timeout elapses the
    /// process is killed. The handle is released only once the process has
    /// exited; if it cannot be killed the handle is kept and an error is
    /// returned. Stopping a process that isn't running is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let _op = self.op.lock().await;

        let (pid, stdin) = {
            let mut guard = self.lock_child()?;
            let Some(child) = guard.as_mut() else {
                return Ok(());
            };
            let pid = child.id();
            if !matches!(child.try_status(), Ok(None)) {
                tracing::debug!(server = %self.name, pid, "Process had already exited");
                guard.take();
                return Ok(());
            }
            (pid, child.stdin.take())
        };

        let graceful = match self.send_stop_command(stdin).await {
            Ok(()) => {
                if self.wait_for_exit(self.spec.stop_timeout).await? {
                    tracing::info!(server = %self.name, pid, "Server process exited gracefully");
                    true
                } else {
                    tracing::warn!(
                        server = %self.name,
                        pid,
                        timeout_secs = self.spec.stop_timeout.as_secs_f64(),
                        "Server process ignored stop command"
                    );
                    false
                }
            }
            Err(e) => {
                tracing::warn!(server = %self.name, pid, error = %e, "Failed to send stop command");
                false
            }
        };

        if !graceful {
            self.force_kill(pid).await?;
        }

        self.lock_child()?.take();
        tracing::info!(server = %self.name, pid, "Server process stopped");
        Ok(())
    }

    fn lock_child(&self) -> Result<MutexGuard<'_, Option<Child>>> {
        self.child
            .lock()
            .map_err(|_| Error::ProcessControl("Failed to lock process handle".to_string()))
    }

    /// True once the tracked child has exited
    fn has_exited(&self) -> Result<bool> {
        let mut guard = self.lock_child()?;
        Ok(match guard.as_mut() {
            Some(child) => !matches!(child.try_status(), Ok(None)),
            None => true,
        })
    }

    /// Poll for exit until `budget` elapses. Returns whether the child exited.
    async fn wait_for_exit(&self, budget: Duration) -> Result<bool> {
        let deadline = Instant::now() + budget;
        loop {
            if self.has_exited()? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    async fn force_kill(&self, pid: u32) -> Result<()> {
        tracing::warn!(server = %self.name, pid, "Killing server process");

        {
            let mut guard = self.lock_child()?;
            if let Some(child) = guard.as_mut() {
                if let Err(e) = child.kill() {
                    // The process may have exited between the timeout and the kill.
                    if matches!(child.try_status(), Ok(None)) {
                        return Err(Error::ProcessControl(format!(
                            "Failed to kill process {}: {}",
                            pid, e
                        )));
                    }
                }
            }
        }

        if !self.wait_for_exit(KILL_REAP_TIMEOUT).await? {
            return Err(Error::ProcessControl(format!(
                "Process {} did not exit after being killed",
                pid
            )));
        }
        Ok(())
    }

    async fn send_stop_command(&self, stdin: Option<ChildStdin>) -> Result<()> {
        let mut stdin =
            stdin.ok_or_else(|| Error::ProcessControl("Process stdin is not available".to_string()))?;

        let line = format!("{}\n", self.spec.stop_command);
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::ProcessControl(format!("Failed to write stop command: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| Error::ProcessControl(format!("Failed to flush stop command: {}", e)))?;

        Ok(())
    }
}

fn spawn_stdout_drain(name: String, stdout: ChildStdout) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(Ok(line)) = lines.next().await {
            tracing::debug!(target: "game_runner::console", server = %name, "{}", line);
        }
    });
}

fn spawn_stderr_drain(name: String, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Some(Ok(line)) = lines.next().await {
            tracing::debug!(target: "game_runner::console", server = %name, stream = "stderr", "{}", line);
        }
    });
}
