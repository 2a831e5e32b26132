use super::messages::{ApiEnvelope, ChunkQuery, CreateEventRequest, EventWithChunks};
use super::state::AppState;
use crate::error::PipelineError;
use crate::event::{Chunk, Event, EventPatch};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, info};

const EVENT_LIST_LIMIT: usize = 50;

// ============================================================================
// Events
// ============================================================================

/// POST /events
/// Create a new event in the idle state
pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Response {
    if request.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiEnvelope::<Event>::err("Event name is required")),
        )
            .into_response();
    }

    let event = Event::new(request.name, request.glossary);
    match state.store.create_event(event).await {
        Ok(event) => {
            info!(event_id = %event.id, "event created");
            (StatusCode::OK, Json(ApiEnvelope::ok(event))).into_response()
        }
        Err(e) => {
            error!("failed to create event: {:#}", e);
            storage_error::<Event>(e)
        }
    }
}

/// GET /events
/// List recent events, newest first
pub async fn list_events(State(state): State<AppState>) -> Response {
    match state.store.list_events(EVENT_LIST_LIMIT).await {
        Ok(events) => (StatusCode::OK, Json(ApiEnvelope::ok(events))).into_response(),
        Err(e) => {
            error!("failed to list events: {:#}", e);
            storage_error::<Vec<Event>>(e)
        }
    }
}

/// GET /events/:event_id
/// Get an event along with its full chunk history
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Response {
    let event = match state.store.get_event(&event_id).await {
        Ok(Some(event)) => event,
        Ok(None) => return event_not_found(&event_id),
        Err(e) => {
            error!("failed to fetch event: {:#}", e);
            return storage_error::<EventWithChunks>(e);
        }
    };

    match state.store.chunks_after(&event_id, -1).await {
        Ok(chunks) => (
            StatusCode::OK,
            Json(ApiEnvelope::ok(EventWithChunks { event, chunks })),
        )
            .into_response(),
        Err(e) => {
            error!("failed to fetch chunks: {:#}", e);
            storage_error::<EventWithChunks>(e)
        }
    }
}

/// PATCH /events/:event_id
/// Apply a status transition and/or glossary update
pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(patch): Json<EventPatch>,
) -> Response {
    match state.store.update_event(&event_id, patch).await {
        Ok(Some(event)) => {
            info!(event_id = %event.id, status = ?event.status, "event updated");
            (StatusCode::OK, Json(ApiEnvelope::ok(event))).into_response()
        }
        Ok(None) => event_not_found(&event_id),
        Err(e) => {
            error!("failed to update event: {:#}", e);
            storage_error::<Event>(e)
        }
    }
}

/// GET /events/:event_id/chunks?after=N
/// Incremental chunk poll for viewers; `after` defaults to -1
pub async fn get_chunks(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<ChunkQuery>,
) -> Response {
    match state.store.chunks_after(&event_id, query.after).await {
        Ok(chunks) => (StatusCode::OK, Json(ApiEnvelope::ok(chunks))).into_response(),
        Err(e) => {
            error!("failed to fetch chunks: {:#}", e);
            storage_error::<Vec<Chunk>>(e)
        }
    }
}

// ============================================================================
// Segment processing
// ============================================================================

/// POST /transcribe
/// Process one uploaded audio segment into a bilingual chunk
pub async fn process_segment(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut audio: Option<Vec<u8>> = None;
    let mut event_id: Option<String> = None;
    let mut chunk_index: Option<String> = None;
    let mut start_time: Option<String> = None;
    let mut end_time: Option<String> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().map(str::to_string);
                match name.as_deref() {
                    Some("audio") => match field.bytes().await {
                        Ok(bytes) => audio = Some(bytes.to_vec()),
                        Err(e) => return bad_request(format!("unreadable audio field: {}", e)),
                    },
                    Some("eventId") => match field.text().await {
                        Ok(text) => event_id = Some(text),
                        Err(e) => return bad_request(format!("unreadable eventId field: {}", e)),
                    },
                    Some("chunkIndex") => match field.text().await {
                        Ok(text) => chunk_index = Some(text),
                        Err(e) => {
                            return bad_request(format!("unreadable chunkIndex field: {}", e))
                        }
                    },
                    Some("startTime") => match field.text().await {
                        Ok(text) => start_time = Some(text),
                        Err(e) => return bad_request(format!("unreadable startTime field: {}", e)),
                    },
                    Some("endTime") => match field.text().await {
                        Ok(text) => end_time = Some(text),
                        Err(e) => return bad_request(format!("unreadable endTime field: {}", e)),
                    },
                    _ => {}
                }
            }
            Ok(None) => break,
            Err(e) => return bad_request(format!("malformed multipart payload: {}", e)),
        }
    }

    let (audio, event_id, chunk_index) = match (audio, event_id, chunk_index) {
        (Some(audio), Some(event_id), Some(chunk_index)) => (audio, event_id, chunk_index),
        _ => return bad_request("Missing required fields: audio, eventId, chunkIndex"),
    };

    let chunk_index: u32 = match chunk_index.trim().parse() {
        Ok(index) => index,
        Err(_) => return bad_request(format!("invalid chunkIndex: {}", chunk_index)),
    };
    let start_ms = match parse_offset(start_time.as_deref()) {
        Ok(ms) => ms,
        Err(message) => return bad_request(message),
    };
    let end_ms = match parse_offset(end_time.as_deref()) {
        Ok(ms) => ms,
        Err(message) => return bad_request(message),
    };

    let request = crate::pipeline::SegmentRequest {
        event_id,
        chunk_index,
        audio,
        start_ms,
        end_ms,
    };

    match state.pipeline.process_segment(request).await {
        Ok(Some(chunk)) => (StatusCode::OK, Json(ApiEnvelope::ok(chunk))).into_response(),
        Ok(None) => (StatusCode::OK, Json(ApiEnvelope::<Chunk>::empty())).into_response(),
        Err(e) => {
            error!("segment processing failed: {:#}", e);
            (pipeline_status(&e), Json(ApiEnvelope::<Chunk>::err(e.to_string()))).into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_offset(raw: Option<&str>) -> Result<i64, String> {
    match raw {
        None => Ok(0),
        Some(text) => text
            .trim()
            .parse()
            .map_err(|_| format!("invalid time offset: {}", text)),
    }
}

fn pipeline_status(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PipelineError::EventNotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::Capability(_) | PipelineError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiEnvelope::<Chunk>::err(message)),
    )
        .into_response()
}

fn event_not_found(event_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiEnvelope::<Event>::err(format!(
            "Event {} not found",
            event_id
        ))),
    )
        .into_response()
}

fn storage_error<T: serde::Serialize>(error: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiEnvelope::<T>::err(format!("{:#}", error))),
    )
        .into_response()
}
