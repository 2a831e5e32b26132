use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted segment upload. A 15-second 16kHz mono WAV is well under
/// 1 MiB; this leaves room for higher sample rates.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Event management
        .route(
            "/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route(
            "/events/:event_id",
            get(handlers::get_event).patch(handlers::update_event),
        )
        // Chunk polling for viewers
        .route("/events/:event_id/chunks", get(handlers::get_chunks))
        // Segment processing
        .route("/transcribe", post(handlers::process_segment))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
