use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Document analysis
        .route("/documents/analyze", post(handlers::analyze_document))
        // Live consultation control
        .route("/consultation/start", post(handlers::start_consultation))
        .route("/consultation/stop", post(handlers::stop_consultation))
        .route("/consultation/status", get(handlers::consultation_status))
        .route(
            "/consultation/transcript",
            get(handlers::consultation_transcript),
        )
        // Analysis readback and citation checks
        .route("/speech", post(handlers::generate_speech))
        .route("/citations/verify", post(handlers::verify_citations))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
