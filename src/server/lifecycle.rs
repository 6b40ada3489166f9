use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a managed server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// Record accepted, install job queued or running
    Installing,
    /// Installed and not running
    Stopped,
    /// Server process is running
    Running,
    /// Install failed
    Error,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServerStatus::Installing => "installing",
            ServerStatus::Stopped => "stopped",
            ServerStatus::Running => "running",
            ServerStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Server lifecycle event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerLifecycleEvent {
    /// Install worker finished successfully
    InstallSucceeded,
    /// Install worker failed
    InstallFailed,
    /// Explicit start
    Started,
    /// Explicit stop
    Stopped,
    /// Reconciliation found no live process
    ProcessExited,
    /// Reconciliation found a live process
    ProcessDetected,
}

impl ServerStatus {
    /// Status after `event`, or the reason the event is not allowed now.
    ///
    /// ```
    /// use game_runner::server::{ServerLifecycleEvent, ServerStatus};
    ///
    /// let status = ServerStatus::Installing
    ///     .apply(ServerLifecycleEvent::InstallSucceeded)
    ///     .unwrap();
    /// assert_eq!(status, ServerStatus::Stopped);
    /// assert!(ServerStatus::Installing.apply(ServerLifecycleEvent::Started).is_err());
    /// ```
    pub fn apply(self, event: ServerLifecycleEvent) -> Result<ServerStatus> {
        use ServerLifecycleEvent as E;
        use ServerStatus as S;

        match (self, event) {
            (S::Installing, E::InstallSucceeded) => Ok(S::Stopped),
            (S::Installing, E::InstallFailed) => Ok(S::Error),
            (_, E::InstallSucceeded | E::InstallFailed) => Err(Error::Conflict(format!(
                "install result arrived for a server that is {}",
                self
            ))),

            (S::Installing, E::Started | E::Stopped) => Err(Error::Conflict(
                "server is still installing".to_string(),
            )),
            (S::Error, E::Started) => Err(Error::Conflict(
                "server failed to install and cannot be started".to_string(),
            )),
            (S::Stopped | S::Running, E::Started) => Ok(S::Running),
            (S::Stopped | S::Running, E::Stopped) => Ok(S::Stopped),
            (S::Error, E::Stopped) => Ok(S::Error),

            // Drift correction only concerns installed servers.
            (S::Running, E::ProcessExited) => Ok(S::Stopped),
            (S::Stopped, E::ProcessDetected) => Ok(S::Running),
            (_, E::ProcessExited | E::ProcessDetected) => Ok(self),
        }
    }

    /// Whether an uninstall may proceed from this status
    pub fn ensure_removable(self) -> Result<()> {
        match self {
            ServerStatus::Installing => Err(Error::Conflict(
                "server is still installing".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
