//! Consumer-side caption feed.
//!
//! Reconstructs a strictly ordered, append-only caption stream from
//! incremental polls. Gaps in the index sequence (discarded segments) are
//! tolerated and never backfilled.

mod source;

use crate::event::{Chunk, EventStatus};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

pub use source::{FeedSource, HttpFeedSource};

/// Incrementally polls for chunks and maintains a local ordered view.
///
/// The local sequence only ever grows at the end: once a chunk is appended
/// it is never removed or reordered, and stale indices returned by a later
/// poll are dropped.
pub struct ChunkFeed {
    source: Arc<dyn FeedSource>,
    event_id: String,
    poll_interval: Duration,
    cursor: i64,
    chunks: Vec<Chunk>,
}

impl ChunkFeed {
    pub fn new(source: Arc<dyn FeedSource>, event_id: String, poll_interval: Duration) -> Self {
        Self {
            source,
            event_id,
            poll_interval,
            cursor: -1,
            chunks: Vec::new(),
        }
    }

    /// Highest chunk index seen so far, -1 before the first chunk.
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Fetch chunks newer than the cursor and append them; returns the newly
    /// appended chunks.
    pub async fn poll_once(&mut self) -> Result<Vec<Chunk>> {
        let mut fetched = self.source.chunks_after(&self.event_id, self.cursor).await?;
        fetched.sort_by_key(|chunk| chunk.chunk_index);

        let mut appended = Vec::new();
        for chunk in fetched {
            if (chunk.chunk_index as i64) <= self.cursor {
                debug!(
                    chunk_index = chunk.chunk_index,
                    cursor = self.cursor,
                    "dropping stale chunk from poll response"
                );
                continue;
            }
            self.cursor = chunk.chunk_index as i64;
            self.chunks.push(chunk.clone());
            appended.push(chunk);
        }
        Ok(appended)
    }

    /// Poll at a fixed cadence while the event is live, forwarding each new
    /// chunk. For an idle or ended event a single fetch suffices and the
    /// loop exits, so finished events produce no polling load.
    pub async fn follow(mut self, out: mpsc::Sender<Chunk>) -> Result<()> {
        loop {
            let status = self.source.event_status(&self.event_id).await?;
            let appended = self.poll_once().await?;
            for chunk in appended {
                if out.send(chunk).await.is_err() {
                    return Ok(());
                }
            }
            if status != EventStatus::Live {
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
