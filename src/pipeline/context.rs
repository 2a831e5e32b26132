use crate::error::PipelineError;
use crate::store::EventStore;

/// Trailing source-text excerpt from the chunk preceding `chunk_index`.
///
/// Index 0 has no predecessor and never gets context. A missing predecessor
/// (degenerate, never persisted) degrades silently to no context rather than
/// failing the request.
pub async fn trailing_context(
    store: &dyn EventStore,
    event_id: &str,
    chunk_index: u32,
    max_chars: usize,
) -> Result<Option<String>, PipelineError> {
    if chunk_index == 0 {
        return Ok(None);
    }

    let previous = store
        .get_chunk(event_id, chunk_index - 1)
        .await
        .map_err(PipelineError::Storage)?;

    Ok(previous
        .map(|chunk| tail_chars(&chunk.source_text, max_chars))
        .filter(|context| !context.is_empty()))
}

/// Last `max_chars` characters of `text`, on char boundaries.
fn tail_chars(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        text.to_string()
    } else {
        text.chars().skip(total - max_chars).collect()
    }
}
