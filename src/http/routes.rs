use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/live/start", post(handlers::start_session))
        .route("/live/stop", post(handlers::stop_session))
        // Session queries
        .route("/live/state", get(handlers::get_state))
        .route("/live/transcript", get(handlers::get_transcript))
        .route("/live/stats", get(handlers::get_stats))
        // Request logging, plus permissive CORS for the companion UI
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
