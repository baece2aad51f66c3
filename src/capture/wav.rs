//! WAV-file replay backend.
//!
//! Replays a recorded clip as if it were the live microphone, paced at
//! real time. Useful for rehearsing sessions against a known utterance
//! and for integration tests that need deterministic audio. The camera
//! side is the same test pattern the synthetic backend uses.
//!
//! When the clip runs out (and looping is off) the audio stream ends,
//! which the session treats the same as real hardware dying mid-session.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::chunker::SampleChunker;
use super::synthetic::TestPatternSource;
use super::{AudioBuffer, CaptureBackend, CaptureConfig, CaptureError, CaptureStreams};

const AUDIO_CHANNEL_CAPACITY: usize = 32;

/// Capture backend that replays a WAV file as the microphone.
pub struct WavCaptureBackend {
    path: PathBuf,
    looped: bool,
    replay: Option<JoinHandle<()>>,
    open: bool,
}

impl WavCaptureBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            looped: false,
            replay: None,
            open: false,
        }
    }

    /// Restart the clip from the beginning instead of ending the stream.
    pub fn looped(mut self) -> Self {
        self.looped = true;
        self
    }

    /// Decode the file into fixed-size buffers at the target rate.
    fn load_buffers(&self, config: &CaptureConfig) -> Result<Vec<AudioBuffer>, CaptureError> {
        let mut reader = hound::WavReader::open(&self.path)
            .map_err(|e| CaptureError::DeviceUnavailable(format!("{}: {e}", self.path.display())))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<Result<_, _>>()
                .map_err(|e| CaptureError::DeviceUnavailable(format!("wav read failed: {e}")))?,
            (hound::SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| CaptureError::DeviceUnavailable(format!("wav read failed: {e}")))?,
            (format, bits) => {
                return Err(CaptureError::DeviceUnavailable(format!(
                    "unsupported wav format: {format:?}/{bits}-bit"
                )))
            }
        };

        // Average interleaved channels down to mono
        let mono: Vec<f32> = if spec.channels <= 1 {
            samples
        } else {
            samples
                .chunks(spec.channels as usize)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        // Decimate to the target rate; fractional ratios are not worth
        // supporting for a rehearsal backend
        let resampled: Vec<f32> = if spec.sample_rate == config.sample_rate {
            mono
        } else if config.sample_rate > 0 && spec.sample_rate % config.sample_rate == 0 {
            let step = (spec.sample_rate / config.sample_rate) as usize;
            mono.into_iter().step_by(step).collect()
        } else {
            return Err(CaptureError::DeviceUnavailable(format!(
                "cannot convert {}Hz wav to {}Hz",
                spec.sample_rate, config.sample_rate
            )));
        };

        let mut chunker = SampleChunker::new(config.sample_rate, config.buffer_samples);
        let mut buffers = chunker.push(&resampled);
        if let Some(tail) = chunker.flush() {
            buffers.push(tail);
        }
        Ok(buffers)
    }
}

#[async_trait::async_trait]
impl CaptureBackend for WavCaptureBackend {
    async fn open(&mut self, config: &CaptureConfig) -> Result<CaptureStreams, CaptureError> {
        if self.open {
            return Err(CaptureError::Stream("backend already open".to_string()));
        }

        let buffers = self.load_buffers(config)?;
        if buffers.is_empty() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "{}: file contains no audio",
                self.path.display()
            )));
        }
        debug!(
            path = %self.path.display(),
            buffers = buffers.len(),
            looped = self.looped,
            "wav replay started"
        );

        let (audio_tx, audio_rx) = mpsc::channel(AUDIO_CHANNEL_CAPACITY);
        let period = config.buffer_period();
        let looped = self.looped;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                for buffer in &buffers {
                    ticker.tick().await;
                    if audio_tx.send(buffer.clone()).await.is_err() {
                        return;
                    }
                }
                if !looped {
                    break;
                }
            }
            // Dropping the sender ends the stream, like unplugged hardware
        });

        self.replay = Some(handle);
        self.open = true;

        Ok(CaptureStreams {
            audio: audio_rx,
            frames: Arc::new(TestPatternSource::new(config.frame_width, config.frame_height)),
        })
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        if let Some(handle) = self.replay.take() {
            handle.abort();
        }
        if self.open {
            self.open = false;
        } else {
            warn!("close called on wav backend that was never opened");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn name(&self) -> &str {
        "wav-replay"
    }
}
