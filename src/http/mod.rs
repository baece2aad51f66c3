//! HTTP API server for the companion UI
//!
//! This module provides a REST API for controlling the live session:
//! - POST /live/start - Start a live session
//! - POST /live/stop - Stop the current session
//! - GET /live/state - Query lifecycle state
//! - GET /live/transcript - Get the reply transcript so far
//! - GET /live/stats - Get session statistics
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, ConfigBoundaries, SessionBoundaries};
