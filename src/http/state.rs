use crate::pipeline::ChunkPipeline;
use crate::store::EventStore;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub pipeline: Arc<ChunkPipeline>,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>, pipeline: Arc<ChunkPipeline>) -> Self {
        Self { store, pipeline }
    }
}
