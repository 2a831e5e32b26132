use crate::event::{Chunk, Event, Glossary};
use serde::{Deserialize, Serialize};

/// Uniform response envelope. `data` is always present so a degenerate
/// segment can be reported explicitly as `data: null`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    #[serde(default)]
    pub glossary: Glossary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventWithChunks {
    #[serde(flatten)]
    pub event: Event,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkQuery {
    #[serde(default = "default_after")]
    pub after: i64,
}

fn default_after() -> i64 {
    -1
}
