//! Hardware capture boundary
//!
//! The live session asks the platform for combined microphone + camera
//! access through the [`CaptureBackend`] trait and receives either live
//! streams or a denial. Audio arrives as fixed-size floating-point sample
//! buffers on a channel; video is a continuously-updating [`FrameSource`]
//! that the session samples on demand.
//!
//! Backends included here run without real hardware (synthetic signal and
//! WAV-file replay); platform backends plug in behind the same trait.

pub mod chunker;
pub mod synthetic;
pub mod wav;

pub use chunker::SampleChunker;
pub use synthetic::{SyntheticBackend, TestPatternSource};
pub use wav::WavCaptureBackend;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

/// A fixed-size buffer of microphone samples.
///
/// Samples are mono floating-point in `[-1.0, 1.0]` at the negotiated
/// sample rate. Backends deliver buffers of a constant length so the
/// downstream encoder produces uniform chunks.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Raw samples (f32, mono)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// One uncompressed camera frame (RGB8, row-major).
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Packed RGB8 pixel data, `width * height * 3` bytes
    pub pixels: Vec<u8>,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration handed to a backend when capture is requested.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate for microphone audio
    pub sample_rate: u32,
    /// Fixed number of samples per delivered buffer
    pub buffer_samples: usize,
    /// Camera frame width
    pub frame_width: u32,
    /// Camera frame height
    pub frame_height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000, // 16kHz mono is what the endpoint expects
            buffer_samples: 1024,
            frame_width: 640,
            frame_height: 480,
        }
    }
}

impl CaptureConfig {
    /// Wall-clock duration covered by one audio buffer.
    pub fn buffer_period(&self) -> std::time::Duration {
        let micros = self.buffer_samples as u64 * 1_000_000 / self.sample_rate.max(1) as u64;
        std::time::Duration::from_micros(micros)
    }
}

/// Errors raised at the capture boundary.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The platform or user refused microphone/camera access.
    #[error("capture access denied: {0}")]
    AccessDenied(String),
    /// The requested device or source could not be opened.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    /// A previously working stream failed.
    #[error("capture stream failed: {0}")]
    Stream(String),
}

/// A continuously-updating source of camera frames, sampled on demand.
pub trait FrameSource: Send + Sync {
    /// Snapshot the most recent frame, or `None` while the camera warms up.
    fn latest_frame(&self) -> Option<RawFrame>;
}

/// Live streams handed out once capture access is granted.
pub struct CaptureStreams {
    /// Fixed-size microphone buffers, delivered at the hardware's pace
    pub audio: mpsc::Receiver<AudioBuffer>,
    /// Camera frames, sampled on demand
    pub frames: Arc<dyn FrameSource>,
}

impl std::fmt::Debug for CaptureStreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStreams")
            .field("audio", &self.audio)
            .field("frames", &"Arc<dyn FrameSource>")
            .finish()
    }
}

/// Combined microphone + camera capture backend.
///
/// `open` either grants both streams or fails with
/// [`CaptureError::AccessDenied`]; there is no partial grant. `close` must
/// be safe to call at any time, including before `open` or twice in a row.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Request capture access and start delivering media.
    async fn open(&mut self, config: &CaptureConfig) -> Result<CaptureStreams, CaptureError>;

    /// Stop capturing and release the underlying devices. Idempotent.
    async fn close(&mut self) -> Result<(), CaptureError>;

    /// Whether the backend currently holds open devices.
    fn is_open(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Capture source selection.
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Generated tone + test pattern (development without hardware)
    Synthetic,
    /// Replay a WAV file as the microphone (testing/rehearsal)
    WavFile(PathBuf),
}

/// Builds capture backends from a source selection.
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(source: CaptureSource) -> Result<Box<dyn CaptureBackend>> {
        match source {
            CaptureSource::Synthetic => Ok(Box::new(SyntheticBackend::new())),
            CaptureSource::WavFile(path) => Ok(Box::new(WavCaptureBackend::new(path))),
        }
    }
}
