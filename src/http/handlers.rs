use super::state::AppState;
use crate::session::{LiveError, LiveSession, SessionState, SessionStats, TranscriptEntry};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub state: SessionState,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub state: SessionState,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP status for a failed session start
fn error_status(error: &LiveError) -> StatusCode {
    match error {
        LiveError::CapabilityDenied(_) => StatusCode::FORBIDDEN,
        LiveError::HandshakeTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        LiveError::Transport(_) => StatusCode::BAD_GATEWAY,
        LiveError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LiveError::AlreadyStarted => StatusCode::CONFLICT,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /live/start
/// Start a new live session
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("live-{}", uuid::Uuid::new_v4()));

    info!("Starting live session: {}", session_id);

    let capture = match state.boundaries.capture() {
        Ok(capture) => capture,
        Err(e) => {
            error!("Failed to create capture backend: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to create capture backend: {}", e),
                }),
            )
                .into_response();
        }
    };

    // Claim the session slot; one live session at a time. The claim is
    // what counts: a stored session that has not finished owns the slot
    // even if its own start() has not transitioned it yet.
    let session = {
        let mut slot = state.session.write().await;
        if let Some(existing) = slot.as_ref() {
            if !existing.is_finished() {
                return (
                    StatusCode::CONFLICT,
                    Json(ErrorResponse {
                        error: format!("Session {} is already running", existing.session_id()),
                    }),
                )
                    .into_response();
            }
        }

        let mut config = state.defaults.clone();
        config.session_id = session_id.clone();
        let session = LiveSession::new(config, state.boundaries.transport(), capture);
        *slot = Some(Arc::clone(&session));
        session
    };

    match session.start().await {
        Ok(()) => {
            info!("Live session started: {}", session_id);
            (
                StatusCode::OK,
                Json(StartSessionResponse {
                    session_id: session_id.clone(),
                    state: session.state(),
                    message: format!("Live session {} started", session_id),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to start live session: {}", e);
            (
                error_status(&e),
                Json(ErrorResponse {
                    error: format!("Failed to start live session: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /live/stop
/// Stop the current live session
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = {
        let slot = state.session.read().await;
        slot.clone()
    };

    match session {
        Some(session) => {
            info!("Stopping live session: {}", session.session_id());
            let stats = session.stop().await;
            (
                StatusCode::OK,
                Json(StopSessionResponse {
                    session_id: session.session_id().to_string(),
                    message: "Live session stopped".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No live session has been started".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /live/state
/// Current session lifecycle state (idle when no session exists)
pub async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.session.read().await;
    let response = match slot.as_ref() {
        Some(session) => StateResponse {
            session_id: Some(session.session_id().to_string()),
            state: session.state(),
        },
        None => StateResponse {
            session_id: None,
            state: SessionState::Idle,
        },
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /live/transcript
/// Reply transcript accumulated so far
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let session = {
        let slot = state.session.read().await;
        slot.clone()
    };

    let entries: Vec<TranscriptEntry> = match session {
        Some(session) => session.transcript().snapshot().await,
        None => Vec::new(),
    };
    (StatusCode::OK, Json(entries)).into_response()
}

/// GET /live/stats
/// Statistics for the current session
pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let session = {
        let slot = state.session.read().await;
        slot.clone()
    };

    match session {
        Some(session) => (StatusCode::OK, Json(session.stats().await)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No live session has been started".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
