//! Server-side segment processing.
//!
//! One request turns one audio segment into a persisted bilingual chunk, or
//! determines the segment carries no content. Requests are independent and
//! stateless apart from reads of shared event/chunk storage, so consecutive
//! indices may be processed concurrently.

mod context;
mod filter;
mod orchestrator;

pub use context::trailing_context;
pub use filter::HallucinationFilter;
pub use orchestrator::{ChunkPipeline, SegmentRequest};
