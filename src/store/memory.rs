use super::EventStore;
use crate::event::{Chunk, Event, EventPatch};
use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// In-memory document store.
///
/// Chunks are held in a per-event `BTreeMap` keyed by chunk index, which
/// makes ascending-index reads and overwrite-idempotent writes fall out of
/// the map semantics.
#[derive(Default)]
pub struct MemoryStore {
    events: RwLock<HashMap<String, Event>>,
    chunks: RwLock<HashMap<String, BTreeMap<u32, Chunk>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryStore {
    async fn create_event(&self, event: Event) -> Result<Event> {
        let mut events = self.events.write().await;
        events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>> {
        let events = self.events.read().await;
        Ok(events.get(event_id).cloned())
    }

    async fn list_events(&self, limit: usize) -> Result<Vec<Event>> {
        let events = self.events.read().await;
        let mut all: Vec<Event> = events.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit);
        Ok(all)
    }

    async fn update_event(&self, event_id: &str, patch: EventPatch) -> Result<Option<Event>> {
        let mut events = self.events.write().await;
        match events.get_mut(event_id) {
            Some(event) => {
                event.apply(patch);
                Ok(Some(event.clone()))
            }
            None => Ok(None),
        }
    }

    async fn put_chunk(&self, chunk: Chunk) -> Result<()> {
        let mut chunks = self.chunks.write().await;
        chunks
            .entry(chunk.event_id.clone())
            .or_default()
            .insert(chunk.chunk_index, chunk);
        Ok(())
    }

    async fn get_chunk(&self, event_id: &str, chunk_index: u32) -> Result<Option<Chunk>> {
        let chunks = self.chunks.read().await;
        Ok(chunks
            .get(event_id)
            .and_then(|by_index| by_index.get(&chunk_index))
            .cloned())
    }

    async fn chunks_after(&self, event_id: &str, after: i64) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.read().await;
        Ok(chunks
            .get(event_id)
            .map(|by_index| {
                by_index
                    .values()
                    .filter(|chunk| chunk.chunk_index as i64 > after)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
