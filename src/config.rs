use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureSettings,
    pub translation: TranslationConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSettings {
    /// Segment cadence in milliseconds (valid range: 3000-15000).
    pub segment_duration_ms: u64,
    /// Segments smaller than this are suppressed before upload.
    pub min_segment_bytes: usize,
    pub sample_rate: u32,
    pub channels: u16,
    /// Feed polling cadence for viewers.
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    /// ISO language code passed to the transcription capability as a hint.
    pub source_language: String,
    /// Human-readable language names used in the translation prompt.
    pub source_language_name: String,
    pub target_language_name: String,
    /// Trailing characters of the previous chunk carried as translation context.
    pub context_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub base_url: String,
    pub transcribe_model: String,
    pub translate_model: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
