// Shared test doubles: a scripted speech model standing in for the external
// transcription/translation capability.
#![allow(dead_code)]

use live_translate::error::CapabilityError;
use live_translate::event::Glossary;
use live_translate::SpeechModel;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Scripted capability: maps exact audio payloads to transcripts and records
/// the continuity context passed to each translation call.
///
/// Unscripted audio transcribes to an empty string (silence). Translation
/// resolves whole-text glossary hits first, otherwise appends an `[en]`
/// marker, and can be switched to return empty output.
#[derive(Default)]
pub struct FakeModel {
    transcripts: Mutex<HashMap<Vec<u8>, String>>,
    pub contexts: Mutex<Vec<Option<String>>>,
    pub translate_to_empty: AtomicBool,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, audio: &[u8], transcript: &str) {
        self.transcripts
            .lock()
            .unwrap()
            .insert(audio.to_vec(), transcript.to_string());
    }

    pub fn recorded_contexts(&self) -> Vec<Option<String>> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SpeechModel for FakeModel {
    async fn transcribe(&self, audio: &[u8], _language: &str) -> Result<String, CapabilityError> {
        Ok(self
            .transcripts
            .lock()
            .unwrap()
            .get(audio)
            .cloned()
            .unwrap_or_default())
    }

    async fn translate(
        &self,
        text: &str,
        glossary: &Glossary,
        prior_context: Option<&str>,
    ) -> Result<String, CapabilityError> {
        self.contexts
            .lock()
            .unwrap()
            .push(prior_context.map(String::from));

        if self.translate_to_empty.load(Ordering::SeqCst) {
            return Ok(String::new());
        }
        Ok(glossary
            .get(text)
            .cloned()
            .unwrap_or_else(|| format!("{} [en]", text)))
    }
}

pub fn translation_config() -> live_translate::config::TranslationConfig {
    live_translate::config::TranslationConfig {
        source_language: "he".to_string(),
        source_language_name: "Hebrew".to_string(),
        target_language_name: "English".to_string(),
        context_chars: 100,
    }
}
