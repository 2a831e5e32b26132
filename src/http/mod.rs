//! HTTP API for operators, capture clients, and viewers:
//! - POST /events - Create an event
//! - GET /events - List recent events
//! - GET /events/:event_id - Event with its full chunk history
//! - PATCH /events/:event_id - Status transitions and glossary updates
//! - GET /events/:event_id/chunks?after=N - Incremental chunk poll
//! - POST /transcribe - Process one uploaded audio segment
//! - GET /health - Health check

mod handlers;
mod messages;
mod routes;
mod state;

pub use messages::{ApiEnvelope, ChunkQuery, CreateEventRequest, EventWithChunks};
pub use routes::create_router;
pub use state::AppState;
