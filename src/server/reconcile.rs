use crate::error::Result;
use crate::server::{ServerLifecycleEvent, ServerRegistry, ServerStatus, SharedRegistry};
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// A status corrected by reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCorrection {
    /// Server name
    pub server_name: String,
    /// Status before the correction
    pub from: ServerStatus,
    /// Status after the correction
    pub to: ServerStatus,
}

/// Correct every stored status that disagrees with the observed process state
///
/// Only records with a template are inspected. Nothing is persisted; the
/// corrected statuses are written with the next durable mutation.
pub fn reconcile(registry: &mut ServerRegistry) -> Vec<StatusCorrection> {
    let mut corrections = Vec::new();

    for record in registry.records_mut() {
        let Some(template) = record.template.as_ref() else {
            continue;
        };

        let event = if template.is_running() {
            ServerLifecycleEvent::ProcessDetected
        } else {
            ServerLifecycleEvent::ProcessExited
        };

        let Ok(next) = record.status.apply(event) else {
            continue;
        };

        if next != record.status {
            tracing::info!(
                server_name = %record.name,
                from = %record.status,
                to = %next,
                "Corrected drifted server status"
            );
            corrections.push(StatusCorrection {
                server_name: record.name.clone(),
                from: record.status,
                to: next,
            });
            record.status = next;
        }
    }

    corrections
}

/// Periodic reconciliation task
///
/// Ticks never overlap: each pass runs to completion on the task before the
/// next tick is awaited, and missed ticks are skipped.
pub struct Reconciler {
    registry: SharedRegistry,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl Reconciler {
    /// Create a new reconciler
    pub fn new(registry: SharedRegistry, interval: Duration) -> Self {
        Self {
            registry,
            interval,
            task: None,
        }
    }

    /// Whether the periodic task is running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start the periodic task
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let registry = self.registry.clone();
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                let mut registry = registry.lock().await;
                let corrections = reconcile(&mut registry);
                if !corrections.is_empty() {
                    tracing::debug!(num_corrections = corrections.len(), "Reconciliation pass finished");
                }
            }
        });

        tracing::info!(interval_secs = period.as_secs_f64(), "Reconciler started");
        self.task = Some(task);

        Ok(())
    }

    /// Stop the periodic task
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("Reconciler stopped");
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.stop();
    }
}
