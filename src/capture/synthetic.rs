//! Synthetic capture backend: generated tone plus a moving test pattern.
//!
//! Lets the whole pipeline run on machines with no microphone or camera
//! (CI, headless dev boxes). The audio side emits a steady sine tone at
//! the configured buffer cadence; the video side renders a gradient that
//! shifts over time so sampled frames are visibly distinct.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, trace};

use super::{
    AudioBuffer, CaptureBackend, CaptureConfig, CaptureError, CaptureStreams, FrameSource,
    RawFrame,
};

const AUDIO_CHANNEL_CAPACITY: usize = 32;

/// Capture backend producing a 440Hz tone and a test-pattern camera feed.
pub struct SyntheticBackend {
    tone_hz: f32,
    generator: Option<JoinHandle<()>>,
    open: bool,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self {
            tone_hz: 440.0,
            generator: None,
            open: false,
        }
    }

    /// Override the generated tone frequency.
    pub fn with_tone_hz(mut self, tone_hz: f32) -> Self {
        self.tone_hz = tone_hz;
        self
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureBackend for SyntheticBackend {
    async fn open(&mut self, config: &CaptureConfig) -> Result<CaptureStreams, CaptureError> {
        if self.open {
            return Err(CaptureError::Stream("backend already open".to_string()));
        }

        let (audio_tx, audio_rx) = mpsc::channel(AUDIO_CHANNEL_CAPACITY);
        let sample_rate = config.sample_rate;
        let buffer_samples = config.buffer_samples;
        let period = config.buffer_period();
        let tone_hz = self.tone_hz;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut phase = 0.0f32;
            let step = TAU * tone_hz / sample_rate as f32;
            let mut emitted: u64 = 0;

            loop {
                ticker.tick().await;
                let mut samples = Vec::with_capacity(buffer_samples);
                for _ in 0..buffer_samples {
                    samples.push(0.3 * phase.sin());
                    phase = (phase + step) % TAU;
                }
                let buffer = AudioBuffer {
                    samples,
                    sample_rate,
                    timestamp_ms: emitted * 1000 / sample_rate.max(1) as u64,
                };
                emitted += buffer_samples as u64;

                match audio_tx.try_send(buffer) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        // Consumer is behind; drop like real hardware would
                        trace!("synthetic audio buffer dropped, channel full");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        });

        self.generator = Some(handle);
        self.open = true;
        debug!(sample_rate, buffer_samples, "synthetic capture started");

        Ok(CaptureStreams {
            audio: audio_rx,
            frames: Arc::new(TestPatternSource::new(config.frame_width, config.frame_height)),
        })
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        if let Some(handle) = self.generator.take() {
            handle.abort();
        }
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Camera stand-in: renders an RGB gradient whose blue channel scrolls
/// with wall-clock time.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    epoch: Instant,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            epoch: Instant::now(),
        }
    }
}

impl FrameSource for TestPatternSource {
    fn latest_frame(&self) -> Option<RawFrame> {
        let elapsed_ms = self.epoch.elapsed().as_millis() as u64;
        let shift = (elapsed_ms / 10 % 256) as u8;
        let mut pixels = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                pixels.push((x * 255 / self.width) as u8);
                pixels.push((y * 255 / self.height) as u8);
                pixels.push(shift);
            }
        }
        Some(RawFrame {
            width: self.width,
            height: self.height,
            pixels,
            timestamp_ms: elapsed_ms,
        })
    }
}
