//! Event/chunk storage collaborator.
//!
//! The pipeline treats storage as a document store with simple CRUD
//! semantics. `EventStore` is the seam; `MemoryStore` is the in-process
//! implementation used by the server and by tests.

mod memory;

use crate::event::{Chunk, Event, EventPatch};
use anyhow::Result;

pub use memory::MemoryStore;

#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, event: Event) -> Result<Event>;

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>>;

    /// Most recently created events first.
    async fn list_events(&self, limit: usize) -> Result<Vec<Event>>;

    /// Apply a patch; returns the updated event, or None if it does not exist.
    async fn update_event(&self, event_id: &str, patch: EventPatch) -> Result<Option<Event>>;

    /// Write a chunk keyed by (event_id, chunk_index). Overwriting, so a
    /// retried write for the same index is idempotent.
    async fn put_chunk(&self, chunk: Chunk) -> Result<()>;

    async fn get_chunk(&self, event_id: &str, chunk_index: u32) -> Result<Option<Chunk>>;

    /// Chunks with index strictly greater than `after`, ascending.
    /// `after = -1` returns everything.
    async fn chunks_after(&self, event_id: &str, after: i64) -> Result<Vec<Chunk>>;
}
