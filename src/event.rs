use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Source-language term → target-language term mapping enforced during translation.
pub type Glossary = BTreeMap<String, String>;

/// Lifecycle state of a translation event. Transitions are admin-triggered,
/// never inferred from chunk activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Idle,
    Live,
    Ended,
}

/// A live translation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub status: EventStatus,
    /// Fixed term translations supplied by the operator.
    pub glossary: Glossary,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Partial update applied to an event via the status/glossary endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub status: Option<EventStatus>,
    pub glossary: Option<Glossary>,
}

impl Event {
    pub fn new(name: String, glossary: Glossary) -> Self {
        Self {
            id: format!("event-{}", uuid::Uuid::new_v4()),
            name,
            status: EventStatus::Idle,
            glossary,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Apply a status/glossary patch. Going live stamps `started_at`, ending
    /// stamps `ended_at`. A glossary update replaces the mapping wholesale.
    pub fn apply(&mut self, patch: EventPatch) {
        if let Some(status) = patch.status {
            if self.status == EventStatus::Ended && status == EventStatus::Idle {
                warn!(
                    event_id = %self.id,
                    "event reset to idle keeps its chunk history; a restarted recording will collide with existing chunk indices"
                );
            }
            match status {
                EventStatus::Live => self.started_at = Some(Utc::now()),
                EventStatus::Ended => self.ended_at = Some(Utc::now()),
                EventStatus::Idle => {}
            }
            self.status = status;
        }
        if let Some(glossary) = patch.glossary {
            self.glossary = glossary;
        }
    }
}

/// The persisted bilingual record for one accepted audio segment.
///
/// Chunks are append-only: written exactly once per accepted segment (the
/// write is keyed and overwriting, so retries are idempotent), never mutated,
/// never deleted within normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Deterministic identity: `"{event_id}_{chunk_index}"`.
    pub id: String,
    pub event_id: String,
    pub chunk_index: u32,
    pub source_text: String,
    pub target_text: String,
    /// Segment start offset in milliseconds from event start.
    pub start_time: i64,
    /// Segment end offset in milliseconds from event start.
    pub end_time: i64,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(
        event_id: &str,
        chunk_index: u32,
        source_text: String,
        target_text: String,
        start_time: i64,
        end_time: i64,
    ) -> Self {
        Self {
            id: chunk_id(event_id, chunk_index),
            event_id: event_id.to_string(),
            chunk_index,
            source_text,
            target_text,
            start_time,
            end_time,
            created_at: Utc::now(),
        }
    }
}

/// Deterministic chunk identity, shared by writes and retried writes.
pub fn chunk_id(event_id: &str, chunk_index: u32) -> String {
    format!("{}_{}", event_id, chunk_index)
}
