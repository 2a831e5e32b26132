use super::context::trailing_context;
use super::filter::HallucinationFilter;
use crate::capability::SpeechModel;
use crate::config::TranslationConfig;
use crate::error::PipelineError;
use crate::event::Chunk;
use crate::store::EventStore;
use std::sync::Arc;
use tracing::{debug, info};

/// One audio segment plus its ordering metadata, as received from a sender.
#[derive(Debug, Clone)]
pub struct SegmentRequest {
    pub event_id: String,
    pub chunk_index: u32,
    pub audio: Vec<u8>,
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Processes one segment into a persisted bilingual chunk.
pub struct ChunkPipeline {
    store: Arc<dyn EventStore>,
    model: Arc<dyn SpeechModel>,
    filter: HallucinationFilter,
    source_language: String,
    context_chars: usize,
}

impl ChunkPipeline {
    pub fn new(
        store: Arc<dyn EventStore>,
        model: Arc<dyn SpeechModel>,
        translation: &TranslationConfig,
    ) -> Self {
        Self {
            store,
            model,
            filter: HallucinationFilter::new(),
            source_language: translation.source_language.clone(),
            context_chars: translation.context_chars,
        }
    }

    /// Transcribe, translate, and persist one segment.
    ///
    /// Returns `Ok(None)` for a degenerate segment: silence, a recognized
    /// transcription artifact, or an empty translation. Nothing is persisted
    /// in that case, so no chunk is ever visible with only one language
    /// populated. The storage write is keyed by (event, index) and
    /// overwriting, so a retried request is idempotent.
    pub async fn process_segment(
        &self,
        request: SegmentRequest,
    ) -> Result<Option<Chunk>, PipelineError> {
        if request.audio.is_empty() {
            return Err(PipelineError::InvalidInput(
                "audio payload is empty".to_string(),
            ));
        }

        let event = self
            .store
            .get_event(&request.event_id)
            .await
            .map_err(PipelineError::Storage)?
            .ok_or_else(|| PipelineError::EventNotFound(request.event_id.clone()))?;

        let prior_context = trailing_context(
            self.store.as_ref(),
            &request.event_id,
            request.chunk_index,
            self.context_chars,
        )
        .await?;

        let raw = self
            .model
            .transcribe(&request.audio, &self.source_language)
            .await?;
        let source_text = self.filter.clean(&raw);
        if source_text.is_empty() {
            debug!(
                event_id = %request.event_id,
                chunk_index = request.chunk_index,
                "segment transcribed to nothing, skipping"
            );
            return Ok(None);
        }

        let target_text = self
            .model
            .translate(source_text, &event.glossary, prior_context.as_deref())
            .await?;
        let target_text = target_text.trim();
        if target_text.is_empty() {
            debug!(
                event_id = %request.event_id,
                chunk_index = request.chunk_index,
                "segment translated to nothing, skipping"
            );
            return Ok(None);
        }

        let chunk = Chunk::new(
            &request.event_id,
            request.chunk_index,
            source_text.to_string(),
            target_text.to_string(),
            request.start_ms,
            request.end_ms,
        );
        self.store
            .put_chunk(chunk.clone())
            .await
            .map_err(PipelineError::Storage)?;

        info!(
            event_id = %chunk.event_id,
            chunk_index = chunk.chunk_index,
            source_chars = chunk.source_text.chars().count(),
            "chunk persisted"
        );

        Ok(Some(chunk))
    }
}
