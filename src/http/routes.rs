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
        // Recorder state
        .route("/recorder/status", get(handlers::get_status))
        .route("/recorder/devices", get(handlers::list_devices))
        // Recorder control
        .route("/recorder/start", post(handlers::start_recording))
        .route("/recorder/stop", post(handlers::stop_recording))
        .route("/recorder/pause", post(handlers::pause_recording))
        .route("/recorder/resume", post(handlers::resume_recording))
        .route("/recorder/reset", post(handlers::reset_recorder))
        // Finished session
        .route("/recorder/session", get(handlers::get_session))
        .route("/recorder/session/save", post(handlers::save_session))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
