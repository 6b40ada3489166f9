//! Install job queue for Game Runner.
//!
//! Installing a server downloads artifacts and writes files, which is far too
//! slow for the request path. Create requests enqueue an [`InstallJob`] and a
//! single background worker drains the queue in arrival order, one job at a
//! time, writing each outcome back into the registry.

use crate::error::{Error, Result};
use crate::server::{ServerLifecycleEvent, ServerStatus, SharedRegistry};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Installation work for one server record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallJob {
    /// Job identifier, used in logs
    pub id: Uuid,
    /// Name of the record to install
    pub server_name: String,
}

/// FIFO queue of install jobs consumed by exactly one worker
pub struct JobQueue {
    /// Job channel; unbounded so enqueueing never blocks a request
    job_tx: mpsc::UnboundedSender<InstallJob>,
    /// Shutdown signal
    shutdown_tx: watch::Sender<bool>,
    /// Worker task handle
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl JobQueue {
    /// Spawn the worker and return the queue feeding it
    pub fn start(registry: SharedRegistry) -> Self {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = tokio::spawn(run_worker(registry, job_rx, shutdown_rx));
        tracing::info!("Install worker started");

        Self {
            job_tx,
            shutdown_tx,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue an install for `server_name`
    pub fn enqueue(&self, server_name: &str) -> Result<InstallJob> {
        let job = InstallJob {
            id: Uuid::new_v4(),
            server_name: server_name.to_string(),
        };

        self.job_tx
            .send(job.clone())
            .map_err(|_| Error::Other("Install worker is not running".to_string()))?;

        tracing::debug!(job_id = %job.id, server_name = %job.server_name, "Install job queued");
        Ok(job)
    }

    /// Stop the worker
    ///
    /// Jobs still queued are dropped. A job already executing is allowed to
    /// finish, bounded by `budget`.
    pub async fn shutdown(&self, budget: Duration) -> Result<()> {
        let _ = self.shutdown_tx.send(true);

        let worker = self
            .worker
            .lock()
            .map_err(|_| Error::Other("Failed to lock worker handle".to_string()))?
            .take();

        let Some(worker) = worker else {
            return Ok(());
        };

        match tokio::time::timeout(budget, worker).await {
            Ok(Ok(())) => {
                tracing::info!("Install worker stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Other(format!("Install worker panicked: {}", e))),
            Err(_) => {
                tracing::warn!(
                    budget_secs = budget.as_secs_f64(),
                    "Timed out waiting for the install worker"
                );
                Err(Error::Other(
                    "Timed out waiting for the install worker".to_string(),
                ))
            }
        }
    }
}

async fn run_worker(
    registry: SharedRegistry,
    mut job_rx: mpsc::UnboundedReceiver<InstallJob>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            job = job_rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        // Runs outside the select so shutdown never interrupts a started install.
        process_job(&registry, job).await;

        if *shutdown_rx.borrow() {
            break;
        }
    }

    let dropped = job_rx.len();
    if dropped > 0 {
        tracing::warn!(num_jobs = dropped, "Install worker exiting with queued jobs");
    }
}

#[tracing::instrument(skip(registry, job), fields(job_id = %job.id, server_name = %job.server_name))]
async fn process_job(registry: &SharedRegistry, job: InstallJob) {
    let template = {
        let registry = registry.lock().await;
        match registry.find(&job.server_name) {
            Some(record) if record.status == ServerStatus::Installing => record.template(),
            Some(record) => {
                tracing::warn!(status = %record.status, "Skipping install for a server that is not installing");
                return;
            }
            None => {
                tracing::warn!("Skipping install for a server that no longer exists");
                return;
            }
        }
    };

    tracing::info!("Installing server");
    let outcome = match template {
        Ok(template) => template.install().await,
        Err(e) => Err(e),
    };

    let event = match &outcome {
        Ok(()) => {
            tracing::info!("Install finished");
            ServerLifecycleEvent::InstallSucceeded
        }
        Err(e) => {
            tracing::error!(error = %e, "Install error");
            ServerLifecycleEvent::InstallFailed
        }
    };

    let mut registry = registry.lock().await;
    let Some(record) = registry.find_mut(&job.server_name) else {
        return;
    };

    match record.status.apply(event) {
        Ok(next) => record.status = next,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding install result");
            return;
        }
    }

    if let Err(e) = registry.persist().await {
        tracing::error!(error = %e, "Failed to persist install result");
    }
}
