//! Live session management
//!
//! This module provides the `LiveSession` abstraction that manages:
//! - Microphone capture and PCM16 encoding
//! - Periodic camera frame sampling and JPEG compression
//! - A single-writer outbound multiplexer with drop-newest backpressure
//! - The inbound relay that builds the reply transcript
//! - Lifecycle state, error sealing, and close-once teardown

mod config;
mod controller;
mod error;
mod mux;
mod pipeline;
mod relay;
mod sampler;
mod state;
mod stats;
mod transcript;

pub use config::SessionConfig;
pub use controller::LiveSession;
pub use error::LiveError;
pub use state::{ErrorKind, SessionState};
pub use stats::{SessionCounters, SessionStats};
pub use transcript::{Transcript, TranscriptEntry, TranscriptRole};
