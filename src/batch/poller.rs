// src/batch/poller.rs
//! Background status polling for a submitted batch.
//!
//! The task owns nothing but a service handle and a channel sender. It ends
//! on its own after a terminal snapshot or the stall deadline, and at once
//! when its [`PollHandle`] is cancelled or dropped.

use crate::service::{BatchStatusSnapshot, ProcessingService};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Total time after which the batch is reported as stalled.
    pub max_duration: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_duration: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PollEvent {
    Snapshot(BatchStatusSnapshot),
    /// A single failed poll. The next tick retries.
    TransientError(String),
    Stalled { elapsed: Duration },
}

pub struct PollHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    events: mpsc::UnboundedReceiver<PollEvent>,
}

impl PollHandle {
    /// Spawns the poll loop for `batch_id`. `tracked` are the file ids whose
    /// terminal status ends polling.
    pub fn start<S>(service: Arc<S>, batch_id: String, tracked: Vec<String>, config: PollConfig) -> Self
    where
        S: ProcessingService + ?Sized + 'static,
    {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(poll_loop(service, batch_id, tracked, config, cancel.clone(), tx));
        Self {
            cancel,
            task: Some(task),
            events: rx,
        }
    }

    /// Next event, or `None` once the loop has ended and every event was read.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }

    /// Stops all future ticks. Safe to call more than once.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            debug!("Cancelling status polling");
            self.cancel.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels and waits for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Poll task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop<S>(
    service: Arc<S>,
    batch_id: String,
    tracked: Vec<String>,
    config: PollConfig,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<PollEvent>,
) where
    S: ProcessingService + ?Sized,
{
    info!("Polling batch '{}' every {:?}", batch_id, config.interval);
    let started = Instant::now();
    let deadline = started + config.max_duration;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.interval) => {}
        }

        if Instant::now() >= deadline {
            report_stall(&tx, &batch_id, started.elapsed());
            break;
        }

        // A request that never answers must not outlive the deadline.
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep_until(deadline) => {
                report_stall(&tx, &batch_id, started.elapsed());
                break;
            }
            result = service.batch_status(&batch_id) => result,
        };

        match result {
            Ok(snapshot) => {
                let terminal = snapshot.is_terminal_for(&tracked);
                if tx.send(PollEvent::Snapshot(snapshot)).is_err() {
                    break;
                }
                if terminal {
                    debug!("Batch '{}' reached a terminal status", batch_id);
                    break;
                }
            }
            Err(e) => {
                warn!("Status poll for '{}' failed, retrying: {}", batch_id, e);
                if tx.send(PollEvent::TransientError(e.to_string())).is_err() {
                    break;
                }
            }
        }
    }

    cancel.cancel();
    debug!("Stopped polling batch '{}'", batch_id);
}

fn report_stall(tx: &mpsc::UnboundedSender<PollEvent>, batch_id: &str, elapsed: Duration) {
    warn!("Batch '{}' not finished after {:?}, giving up", batch_id, elapsed);
    let _ = tx.send(PollEvent::Stalled { elapsed });
}
