pub mod backend;
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioFrame};
pub use microphone::MicrophoneBackend;
