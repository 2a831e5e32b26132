//! Error taxonomy for the server-side processing pipeline.
//!
//! Client-side upload failures are reported through status channels rather
//! than error returns, so a single bad segment never halts the capture loop.

use thiserror::Error;

/// Failure of the external transcription/translation capability.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("translation failed: {0}")]
    Translation(String),

    #[error("capability request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failure of a single segment-processing request.
///
/// A degenerate (silent/hallucinated) segment is not an error; the pipeline
/// reports it as a successful result carrying no chunk.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or malformed request fields. Not retried.
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// The referenced event does not exist. Not retried.
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// External capability failure, surfaced to the caller unretried.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),
}
