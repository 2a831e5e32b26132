pub mod audio;
pub mod capability;
pub mod capture;
pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod http;
pub mod pipeline;
pub mod store;

pub use audio::{AudioBackend, AudioBackendConfig, AudioFrame, MicrophoneBackend};
pub use capability::{OpenAiModel, SpeechModel};
pub use capture::{
    CaptureConfig, CaptureSession, ChunkSender, Segment, SegmentTranscoder, TranscoderConfig,
    UploadStatus,
};
pub use config::Config;
pub use error::{CapabilityError, PipelineError};
pub use event::{chunk_id, Chunk, Event, EventPatch, EventStatus, Glossary};
pub use feed::{ChunkFeed, FeedSource, HttpFeedSource};
pub use http::{create_router, ApiEnvelope, AppState};
pub use pipeline::{ChunkPipeline, HallucinationFilter, SegmentRequest};
pub use store::{EventStore, MemoryStore};
