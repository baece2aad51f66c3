use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// Point-in-time statistics for a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identifier
    pub session_id: String,

    /// Lifecycle state at snapshot time
    pub state: SessionState,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Seconds since creation
    pub duration_secs: f64,

    /// Audio chunks queued for the endpoint
    pub audio_chunks: usize,

    /// Video chunks queued for the endpoint
    pub video_chunks: usize,

    /// Chunks dropped because the outbound queue was full
    pub chunks_dropped: usize,

    /// Buffers/frames that failed to encode
    pub encode_failures: usize,

    /// Transcript entries received from the endpoint
    pub transcript_entries: usize,
}

/// Shared counters bumped by the producer and relay tasks.
#[derive(Debug, Default)]
pub struct SessionCounters {
    audio_chunks: AtomicUsize,
    video_chunks: AtomicUsize,
    chunks_dropped: AtomicUsize,
    encode_failures: AtomicUsize,
}

impl SessionCounters {
    pub fn record_audio_chunk(&self) {
        self.audio_chunks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_video_chunk(&self) {
        self.video_chunks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drop(&self) {
        self.chunks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn audio_chunks(&self) -> usize {
        self.audio_chunks.load(Ordering::Relaxed)
    }

    pub fn video_chunks(&self) -> usize {
        self.video_chunks.load(Ordering::Relaxed)
    }

    pub fn chunks_dropped(&self) -> usize {
        self.chunks_dropped.load(Ordering::Relaxed)
    }

    pub fn encode_failures(&self) -> usize {
        self.encode_failures.load(Ordering::Relaxed)
    }
}
