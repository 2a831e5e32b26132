//! Client-side capture, segmentation, and upload.
//!
//! A `CaptureSession` owns the microphone for its lifetime: frames flow into
//! the `SegmentTranscoder`, which rotates them into self-contained WAV
//! segments on a fixed cadence, and each segment is handed to the
//! `ChunkSender` for a fire-and-forget upload. Segment production never
//! waits on upload completion, so uploads may finish out of order; ordering
//! is recovered server-side from the chunk index assigned at production time.

mod sender;
mod session;
mod transcoder;

pub use sender::{ChunkSender, UploadStatus};
pub use session::{CaptureConfig, CaptureSession};
pub use transcoder::{Segment, SegmentTranscoder, TranscoderConfig};
