//! External transcription/translation capability.
//!
//! The model is an injected dependency so tests can substitute a scripted
//! fake; nothing in the pipeline knows which provider sits behind the trait.

mod openai;

use crate::error::CapabilityError;
use crate::event::Glossary;

pub use openai::OpenAiModel;

#[async_trait::async_trait]
pub trait SpeechModel: Send + Sync {
    /// Transcribe one self-contained audio segment. `language` is an ISO
    /// code hint for the fixed source language.
    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<String, CapabilityError>;

    /// Translate source-language text to the fixed target language.
    /// Glossary entries are explicit term-substitution directives;
    /// `prior_context` is a continuity hint from the preceding chunk.
    async fn translate(
        &self,
        text: &str,
        glossary: &Glossary,
        prior_context: Option<&str>,
    ) -> Result<String, CapabilityError>;
}
