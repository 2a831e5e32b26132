use super::SpeechModel;
use crate::config::{ModelConfig, TranslationConfig};
use crate::error::CapabilityError;
use crate::event::Glossary;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const TRANSLATE_TEMPERATURE: f32 = 0.4;
const TRANSLATE_MAX_TOKENS: u32 = 2000;

/// OpenAI-backed speech capability: Whisper for transcription, a chat model
/// for translation.
pub struct OpenAiModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    transcribe_model: String,
    translate_model: String,
    source_language_name: String,
    target_language_name: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiModel {
    pub fn new(model: ModelConfig, translation: &TranslationConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: model.base_url.trim_end_matches('/').to_string(),
            api_key,
            transcribe_model: model.transcribe_model,
            translate_model: model.translate_model,
            source_language_name: translation.source_language_name.clone(),
            target_language_name: translation.target_language_name.clone(),
        }
    }

    fn system_prompt(&self, glossary: &Glossary) -> String {
        let mut prompt = format!(
            "You are an expert {src}-to-{tgt} interpreter for live events.\n\n\
             Convey the MEANING and INTENT of the speaker, not a literal \
             word-for-word translation.\n\n\
             Principles:\n\
             1. Understand the meaning first, then express it in natural, idiomatic {tgt}.\n\
             2. This is transcribed speech: clean up verbal fillers and false starts, \
             restructure run-on sentences for clarity, keep the speaker's energy.\n\
             3. If the text is cut off mid-sentence, leave it unfinished naturally.\n\n\
             Output ONLY the {tgt} translation. No explanations, no {src}, no quotes.",
            src = self.source_language_name,
            tgt = self.target_language_name,
        );

        if !glossary.is_empty() {
            prompt.push_str("\n\nGlossary (use these specific translations):\n");
            for (source_term, target_term) in glossary {
                prompt.push_str(&format!("- \"{}\" -> \"{}\"\n", source_term, target_term));
            }
        }

        prompt
    }

    fn user_prompt(&self, text: &str, prior_context: Option<&str>) -> String {
        let context = prior_context
            .map(|ctx| format!("Previous context: \"{}\"\n\n", ctx))
            .unwrap_or_default();
        format!(
            "{}Translate this {} speech to natural {}:\n\n{}",
            context, self.source_language_name, self.target_language_name, text
        )
    }
}

#[async_trait::async_trait]
impl SpeechModel for OpenAiModel {
    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<String, CapabilityError> {
        let part = Part::bytes(audio.to_vec())
            .file_name("segment.wav")
            .mime_str("audio/wav")?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.transcribe_model.clone())
            .text("language", language.to_string())
            .text("response_format", "text");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Transcription(format!(
                "{}: {}",
                status, detail
            )));
        }

        let text = response.text().await?;
        debug!(chars = text.len(), "transcription received");
        Ok(text)
    }

    async fn translate(
        &self,
        text: &str,
        glossary: &Glossary,
        prior_context: Option<&str>,
    ) -> Result<String, CapabilityError> {
        let body = json!({
            "model": self.translate_model,
            "messages": [
                { "role": "system", "content": self.system_prompt(glossary) },
                { "role": "user", "content": self.user_prompt(text, prior_context) },
            ],
            "temperature": TRANSLATE_TEMPERATURE,
            "max_tokens": TRANSLATE_MAX_TOKENS,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Translation(format!(
                "{}: {}",
                status, detail
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let translated = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(translated)
    }
}
