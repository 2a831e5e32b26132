mod common;

use common::{translation_config, FakeModel};
use live_translate::error::PipelineError;
use live_translate::event::{Event, EventPatch, EventStatus, Glossary};
use live_translate::pipeline::{ChunkPipeline, SegmentRequest};
use live_translate::store::{EventStore, MemoryStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn setup() -> (Arc<MemoryStore>, Arc<FakeModel>, ChunkPipeline) {
    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(FakeModel::new());
    let pipeline = ChunkPipeline::new(store.clone(), model.clone(), &translation_config());
    (store, model, pipeline)
}

async fn live_event(store: &MemoryStore, glossary: Glossary) -> Event {
    let event = store
        .create_event(Event::new("Morning session".to_string(), glossary))
        .await
        .unwrap();
    store
        .update_event(
            &event.id,
            EventPatch {
                status: Some(EventStatus::Live),
                glossary: None,
            },
        )
        .await
        .unwrap()
        .unwrap()
}

fn request(event_id: &str, chunk_index: u32, audio: &[u8]) -> SegmentRequest {
    SegmentRequest {
        event_id: event_id.to_string(),
        chunk_index,
        audio: audio.to_vec(),
        start_ms: chunk_index as i64 * 5000,
        end_ms: (chunk_index as i64 + 1) * 5000,
    }
}

#[tokio::test]
async fn clear_speech_produces_bilingual_chunk() {
    let (store, model, pipeline) = setup();
    let mut glossary = Glossary::new();
    glossary.insert("שלום".to_string(), "Hello".to_string());
    let event = live_event(&store, glossary).await;

    model.script(b"seg-0", "שלום");
    let chunk = pipeline
        .process_segment(request(&event.id, 0, b"seg-0"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(chunk.id, format!("{}_0", event.id));
    assert_eq!(chunk.source_text, "שלום");
    assert_eq!(chunk.target_text, "Hello");
    assert_eq!(chunk.start_time, 0);
    assert_eq!(chunk.end_time, 5000);

    let stored = store.chunks_after(&event.id, -1).await.unwrap();
    assert_eq!(stored, vec![chunk]);
}

#[tokio::test]
async fn silence_is_accepted_but_persists_nothing() {
    let (store, _model, pipeline) = setup();
    let event = live_event(&store, Glossary::new()).await;

    // Unscripted audio transcribes to an empty string.
    let result = pipeline
        .process_segment(request(&event.id, 0, b"silent-seg"))
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(store.chunks_after(&event.id, -1).await.unwrap().is_empty());
}

#[tokio::test]
async fn artifact_transcripts_are_discarded() {
    let (store, model, pipeline) = setup();
    let event = live_event(&store, Glossary::new()).await;

    let artifacts = ["Thank you.", "thanks", "תודה", "...", "you", "Bye.", "Okay."];
    for (i, artifact) in artifacts.iter().enumerate() {
        let audio = format!("artifact-{}", i);
        model.script(audio.as_bytes(), artifact);
        let result = pipeline
            .process_segment(request(&event.id, i as u32, audio.as_bytes()))
            .await
            .unwrap();
        assert!(result.is_none(), "artifact {:?} should be discarded", artifact);
    }

    assert!(store.chunks_after(&event.id, -1).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_audio_is_rejected() {
    let (store, _model, pipeline) = setup();
    let event = live_event(&store, Glossary::new()).await;

    let err = pipeline
        .process_segment(request(&event.id, 0, b""))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
}

#[tokio::test]
async fn unknown_event_is_rejected() {
    let (_store, model, pipeline) = setup();
    model.script(b"seg-0", "שלום");

    let err = pipeline
        .process_segment(request("event-missing", 0, b"seg-0"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::EventNotFound(id) if id == "event-missing"));
}

#[tokio::test]
async fn empty_translation_never_persists_a_partial_chunk() {
    let (store, model, pipeline) = setup();
    let event = live_event(&store, Glossary::new()).await;

    model.script(b"seg-0", "טקסט אמיתי");
    model.translate_to_empty.store(true, Ordering::SeqCst);

    let result = pipeline
        .process_segment(request(&event.id, 0, b"seg-0"))
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(store.chunks_after(&event.id, -1).await.unwrap().is_empty());
}

#[tokio::test]
async fn reprocessing_a_segment_is_idempotent() {
    let (store, model, pipeline) = setup();
    let event = live_event(&store, Glossary::new()).await;
    model.script(b"seg-0", "משפט ראשון");

    let first = pipeline
        .process_segment(request(&event.id, 0, b"seg-0"))
        .await
        .unwrap()
        .unwrap();
    let second = pipeline
        .process_segment(request(&event.id, 0, b"seg-0"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.source_text, second.source_text);
    assert_eq!(first.target_text, second.target_text);

    let stored = store.chunks_after(&event.id, -1).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn out_of_order_completion_reads_back_in_index_order() {
    let (store, model, pipeline) = setup();
    let event = live_event(&store, Glossary::new()).await;
    model.script(b"seg-0", "ראשון");
    model.script(b"seg-1", "שני");

    // The later segment lands first; a reader still sees index order.
    pipeline
        .process_segment(request(&event.id, 1, b"seg-1"))
        .await
        .unwrap()
        .unwrap();
    pipeline
        .process_segment(request(&event.id, 0, b"seg-0"))
        .await
        .unwrap()
        .unwrap();

    let stored = store.chunks_after(&event.id, -1).await.unwrap();
    let indices: Vec<u32> = stored.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indices, vec![0, 1]);
}

#[tokio::test]
async fn continuity_context_is_the_predecessor_tail() {
    let (store, model, pipeline) = setup();
    let event = live_event(&store, Glossary::new()).await;

    let long_source = "א".repeat(150);
    model.script(b"seg-0", &long_source);
    model.script(b"seg-1", "המשך");

    pipeline
        .process_segment(request(&event.id, 0, b"seg-0"))
        .await
        .unwrap()
        .unwrap();
    pipeline
        .process_segment(request(&event.id, 1, b"seg-1"))
        .await
        .unwrap()
        .unwrap();

    let contexts = model.recorded_contexts();
    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[0], None);

    let tail = contexts[1].as_deref().unwrap();
    assert_eq!(tail.chars().count(), 100);
    assert!(long_source.ends_with(tail));
}

#[tokio::test]
async fn missing_predecessor_yields_no_context() {
    let (store, model, pipeline) = setup();
    let event = live_event(&store, Glossary::new()).await;
    model.script(b"seg-0", "ראשון");
    model.script(b"seg-2", "שלישי");

    pipeline
        .process_segment(request(&event.id, 0, b"seg-0"))
        .await
        .unwrap()
        .unwrap();
    // Index 1 was discarded upstream, so index 2 has no stored predecessor.
    pipeline
        .process_segment(request(&event.id, 2, b"seg-2"))
        .await
        .unwrap()
        .unwrap();

    let contexts = model.recorded_contexts();
    assert_eq!(contexts, vec![None, None]);
}
