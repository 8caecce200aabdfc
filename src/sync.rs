//! Sync queue: debounced background writes from the editor to the store.
//!
//! DESIGN
//! ======
//! Editing is synchronous and never waits on the store. Every committed edit
//! hands the queue a full snapshot of the diagram; the worker keeps only the
//! latest snapshot per diagram id and writes once the quiet period
//! (`debounce_ms`) has elapsed since the last schedule. A burst of edits
//! therefore costs one write.
//!
//! The worker is a single tokio task fed through an unbounded channel, so
//! scheduling is a non-blocking send from UI code. Status is published on a
//! `watch` channel for the host's save indicator.
//!
//! ERROR HANDLING
//! ==============
//! Each write is attempted up to `retries` times with linear back-off
//! (`attempt * retry_base_ms`). A snapshot that still fails stays pending and
//! the status becomes [`SyncStatus::Error`]; the next schedule or an explicit
//! [`SyncHandle::flush`] retries it. A diagram the store no longer knows is
//! not retried: its snapshot is dropped with an error.
//!
//! Dropping every [`SyncHandle`] flushes what is pending and stops the worker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use canvas::doc::{Diagram, DiagramPatch, ObjectId};

use crate::config::SyncConfig;
use crate::store::{DocumentStore, StoreError};

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;

/// What the save indicator shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Synced,
    Error(String),
}

impl SyncStatus {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

enum Command {
    Schedule(Box<Diagram>),
    Cancel(ObjectId),
    Flush(oneshot::Sender<SyncStatus>),
    ClearError,
}

/// Entry point for the background writer.
pub struct SyncQueue;

impl SyncQueue {
    /// Spawn the worker on the current tokio runtime.
    #[must_use]
    pub fn spawn(store: Arc<dyn DocumentStore>, config: SyncConfig) -> SyncHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SyncStatus::Idle);

        info!(
            debounce_ms = config.debounce_ms,
            retries = config.retries,
            retry_base_ms = config.retry_base_ms,
            "sync worker configured"
        );

        let worker = Worker { store, config, pending: HashMap::new(), status: status_tx };
        tokio::spawn(worker.run(rx));

        SyncHandle { tx, status: status_rx }
    }
}

/// Cheap, cloneable handle to the sync worker.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    /// Queue the latest snapshot of `diagram` and restart the quiet period.
    pub fn schedule(&self, diagram: &Diagram) {
        self.send(Command::Schedule(Box::new(diagram.clone())));
    }

    /// Drop a pending write, e.g. after the diagram was deleted.
    pub fn cancel(&self, id: &str) {
        self.send(Command::Cancel(id.to_string()));
    }

    /// Write everything pending now and wait for the outcome.
    pub async fn flush(&self) -> SyncStatus {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(Command::Flush(ack_tx));
        match ack_rx.await {
            Ok(status) => status,
            Err(_) => self.status.borrow().clone(),
        }
    }

    /// Acknowledge an error; the status returns to idle. Pending snapshots
    /// are kept.
    pub fn clear_error(&self) {
        self.send(Command::ClearError);
    }

    #[must_use]
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("sync worker stopped; command dropped");
        }
    }
}

struct Worker {
    store: Arc<dyn DocumentStore>,
    config: SyncConfig,
    pending: HashMap<ObjectId, Diagram>,
    status: watch::Sender<SyncStatus>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let debounce = Duration::from_millis(self.config.debounce_ms);
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                maybe_command = rx.recv() => {
                    let Some(command) = maybe_command else {
                        self.flush().await;
                        break;
                    };
                    match command {
                        Command::Schedule(diagram) => {
                            debug!(diagram_id = %diagram.id, "sync scheduled");
                            self.pending.insert(diagram.id.clone(), *diagram);
                            deadline = Some(Instant::now() + debounce);
                        }
                        Command::Cancel(id) => {
                            self.pending.remove(&id);
                            if self.pending.is_empty() {
                                deadline = None;
                            }
                        }
                        Command::Flush(ack) => {
                            deadline = None;
                            let status = self.flush().await;
                            if ack.send(status).is_err() {
                                debug!("flush requester went away");
                            }
                        }
                        Command::ClearError => {
                            self.status.send_if_modified(|status| {
                                let was_error = status.is_error();
                                if was_error {
                                    *status = SyncStatus::Idle;
                                }
                                was_error
                            });
                        }
                    }
                }
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    self.flush().await;
                }
            }
        }

        debug!("sync worker stopped");
    }

    /// Write every pending snapshot. Failed ones stay pending.
    async fn flush(&mut self) -> SyncStatus {
        if self.pending.is_empty() {
            return self.status.borrow().clone();
        }

        self.status.send_replace(SyncStatus::Syncing);
        let mut failure: Option<String> = None;

        for (id, diagram) in std::mem::take(&mut self.pending) {
            match write_with_retry(self.store.as_ref(), &diagram, self.config).await {
                Ok(()) => debug!(diagram_id = %id, "diagram synced"),
                Err(e @ StoreError::NotFound(_)) => {
                    error!(error = %e, diagram_id = %id, "sync target missing; dropping snapshot");
                    failure = Some(e.to_string());
                }
                Err(e) => {
                    error!(error = %e, diagram_id = %id, "sync failed after retries; keeping snapshot");
                    failure = Some(e.to_string());
                    self.pending.insert(id, diagram);
                }
            }
        }

        let status = failure.map_or(SyncStatus::Synced, SyncStatus::Error);
        self.status.send_replace(status.clone());
        status
    }
}

async fn write_with_retry(store: &dyn DocumentStore, diagram: &Diagram, config: SyncConfig) -> Result<(), StoreError> {
    let patch = DiagramPatch::full(diagram);
    let mut attempt: usize = 1;
    loop {
        match store.update(&diagram.id, &patch).await {
            Ok(_) => return Ok(()),
            Err(e @ StoreError::NotFound(_)) => return Err(e),
            Err(e) if attempt < config.retries => {
                warn!(
                    error = %e,
                    attempt,
                    total = config.retries,
                    diagram_id = %diagram.id,
                    "diagram write failed; retrying"
                );
                tokio::time::sleep(Duration::from_millis((attempt as u64) * config.retry_base_ms)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
