//! In-process store with a broadcast change feed.

use std::collections::HashMap;

use time::OffsetDateTime;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

use canvas::doc::{Diagram, DiagramPatch, ObjectId, new_id};

use super::{DocumentStore, StoreError, StoreEvent, Subscription, sort_newest_first};

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

const EVENT_CAPACITY: usize = 256;

struct Record {
    owner: String,
    diagram: Diagram,
}

pub struct MemoryStore {
    records: RwLock<HashMap<ObjectId, Record>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { records: RwLock::new(HashMap::new()), events }
    }

    fn publish(&self, event: StoreEvent) {
        // No receivers is the normal case outside of live sessions.
        if self.events.send(event).is_err() {
            debug!("store event had no subscribers");
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, user: &str) -> Result<Vec<Diagram>, StoreError> {
        let records = self.records.read().await;
        let mut diagrams: Vec<Diagram> =
            records.values().filter(|r| r.owner == user).map(|r| r.diagram.clone()).collect();
        sort_newest_first(&mut diagrams);
        Ok(diagrams)
    }

    async fn get(&self, id: &str) -> Result<Diagram, StoreError> {
        let records = self.records.read().await;
        records.get(id).map(|r| r.diagram.clone()).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, user: &str, mut diagram: Diagram) -> Result<Diagram, StoreError> {
        let now = OffsetDateTime::now_utc();
        diagram.id = new_id();
        diagram.created_at = now;
        diagram.last_modified = now;

        self.records
            .write()
            .await
            .insert(diagram.id.clone(), Record { owner: user.to_string(), diagram: diagram.clone() });
        info!(diagram_id = %diagram.id, user, "diagram created");
        self.publish(StoreEvent::Upserted { owner: user.to_string(), diagram: diagram.clone() });
        Ok(diagram)
    }

    async fn update(&self, id: &str, patch: &DiagramPatch) -> Result<Diagram, StoreError> {
        let (owner, diagram) = {
            let mut records = self.records.write().await;
            let record = records.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            record.diagram.apply_patch(patch);
            record.diagram.last_modified = OffsetDateTime::now_utc();
            (record.owner.clone(), record.diagram.clone())
        };
        debug!(diagram_id = %id, "diagram updated");
        self.publish(StoreEvent::Upserted { owner, diagram: diagram.clone() });
        Ok(diagram)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let record = self.records.write().await.remove(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        info!(diagram_id = %id, "diagram deleted");
        self.publish(StoreEvent::Deleted { owner: record.owner, id: id.to_string() });
        Ok(())
    }

    fn subscribe(&self, user: &str) -> Option<Subscription> {
        Some(Subscription::new(user, self.events.subscribe()))
    }
}
