//! Document store collaborator.
//!
//! DESIGN
//! ======
//! The store is the source of truth for a user's diagrams. It assigns ids
//! and timestamps on create and bumps `last_modified` on every update, so
//! callers never invent either. Two backends ship here:
//!
//! - [`MemoryStore`]: in-process map with a broadcast change feed. Used for
//!   tests and for hosts that keep several editors in one process.
//! - [`FileStore`]: one JSON file per diagram. The local-only path.
//!
//! ERROR HANDLING
//! ==============
//! Every operation returns [`StoreError`]. Callers decide whether a failure
//! is fatal; the sync queue retries and keeps the pending snapshot.

mod file;
mod memory;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use canvas::doc::{Diagram, DiagramPatch, ObjectId};

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("diagram not found: {0}")]
    NotFound(ObjectId),
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored diagram is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store backend failed: {0}")]
    Backend(String),
}

/// A change pushed by a store to its subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Upserted { owner: String, diagram: Diagram },
    Deleted { owner: String, id: ObjectId },
}

impl StoreEvent {
    #[must_use]
    pub fn owner(&self) -> &str {
        match self {
            Self::Upserted { owner, .. } | Self::Deleted { owner, .. } => owner,
        }
    }
}

/// Live feed of one user's changes.
pub struct Subscription {
    user: String,
    rx: broadcast::Receiver<StoreEvent>,
}

impl Subscription {
    pub(crate) fn new(user: &str, rx: broadcast::Receiver<StoreEvent>) -> Self {
        Self { user: user.to_string(), rx }
    }

    /// Next event for the subscribed user, or `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.owner() == self.user => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user = %self.user, skipped, "store subscription lagged; events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Persistent home for diagrams, keyed by id and owned by a user.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every diagram owned by `user`, most recently modified first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be read.
    async fn list(&self, user: &str) -> Result<Vec<Diagram>, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no diagram has this id.
    async fn get(&self, id: &str) -> Result<Diagram, StoreError>;

    /// Store a new diagram for `user`. The id and both timestamps of the
    /// argument are replaced; the stored copy is returned.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    async fn create(&self, user: &str, diagram: Diagram) -> Result<Diagram, StoreError>;

    /// Apply a sparse update and bump `last_modified`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no diagram has this id, or a backend error.
    async fn update(&self, id: &str, patch: &DiagramPatch) -> Result<Diagram, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no diagram has this id, or a backend error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Change feed for `user`, when the backend has one.
    fn subscribe(&self, _user: &str) -> Option<Subscription> {
        None
    }
}

/// Newest first; ties keep insertion order.
pub(crate) fn sort_newest_first(diagrams: &mut [Diagram]) {
    diagrams.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
}
