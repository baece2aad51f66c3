use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::capture::CaptureConfig;

/// Configuration for a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (also scopes transport subjects)
    pub session_id: String,

    /// Microphone sample rate in Hz
    pub sample_rate: u32,

    /// Samples per audio buffer handed to the encoder
    pub buffer_samples: usize,

    /// How often a camera frame is sampled and sent
    pub frame_interval: Duration,

    /// JPEG quality for sampled frames (1-100)
    pub jpeg_quality: u8,

    /// Frames wider than this are downscaled before encoding
    pub max_frame_width: u32,

    /// Outbound queue depth; the newest chunk is dropped when the queue
    /// is full
    pub outbound_queue: usize,

    /// How long the endpoint gets to answer the session handshake
    pub handshake_timeout: Duration,

    /// Consecutive send failures tolerated before the session errors
    pub send_retry_limit: u32,

    /// Consecutive encode failures tolerated before the session errors
    pub encode_failure_limit: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("live-{}", uuid::Uuid::new_v4()),
            sample_rate: 16000,                            // what the endpoint expects
            buffer_samples: 1024,                          // 64ms at 16kHz
            frame_interval: Duration::from_millis(500),    // 2 frames/sec
            jpeg_quality: 60,
            max_frame_width: 640,
            outbound_queue: 32,
            handshake_timeout: Duration::from_secs(10),
            send_retry_limit: 3,
            encode_failure_limit: 8,
        }
    }
}

impl SessionConfig {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    /// Capture-boundary view of this config.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.sample_rate,
            buffer_samples: self.buffer_samples,
            ..CaptureConfig::default()
        }
    }

    /// Wall-clock duration covered by one audio buffer.
    pub fn buffer_period(&self) -> Duration {
        self.capture_config().buffer_period()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_endpoint_expectations() {
        let config = SessionConfig::default();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.frame_interval, Duration::from_millis(500));
        assert_eq!(config.buffer_period(), Duration::from_millis(64));
        assert!(config.session_id.starts_with("live-"));
    }

    #[test]
    fn test_capture_config_carries_audio_settings() {
        let config = SessionConfig {
            sample_rate: 8000,
            buffer_samples: 512,
            ..SessionConfig::new("s1")
        };
        let capture = config.capture_config();
        assert_eq!(capture.sample_rate, 8000);
        assert_eq!(capture.buffer_samples, 512);
    }
}
