//! Audio pipeline task: microphone buffers in, encoded chunks out.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::capture::AudioBuffer;
use crate::codec::{encode_audio_chunk, OutboundEnvelope};

use super::error::{FailureSignal, LiveError};
use super::mux::enqueue;
use super::stats::SessionCounters;

/// Encodes microphone buffers as PCM16 chunks and queues them for the
/// multiplexer.
///
/// The pipeline never waits on the transport: enqueueing either succeeds
/// immediately or drops the chunk. A single bad buffer is logged and
/// skipped; failures that keep repeating escalate to session teardown,
/// as does the hardware ending the stream on its own.
pub(crate) struct AudioPipeline {
    pub audio_rx: mpsc::Receiver<AudioBuffer>,
    pub outbound: mpsc::Sender<OutboundEnvelope>,
    pub shutdown: watch::Receiver<bool>,
    pub failures: FailureSignal,
    pub counters: Arc<SessionCounters>,
    pub encode_failure_limit: u32,
}

impl AudioPipeline {
    pub(crate) async fn run(mut self) {
        let mut consecutive_failures = 0u32;

        loop {
            // The flag may predate our subscription, in which case
            // changed() never fires
            if *self.shutdown.borrow() {
                break;
            }
            let buffer = tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                maybe = self.audio_rx.recv() => match maybe {
                    Some(buffer) => buffer,
                    None => {
                        if !*self.shutdown.borrow() {
                            // Hardware died while the session was live
                            self.failures.raise(LiveError::Transport(
                                "capture audio stream ended".to_string(),
                            ));
                        }
                        break;
                    }
                },
            };

            match encode_audio_chunk(&buffer) {
                Ok(chunk) => {
                    consecutive_failures = 0;
                    if !enqueue(&self.outbound, OutboundEnvelope::Audio(chunk), &self.counters) {
                        break;
                    }
                }
                Err(err) => {
                    self.counters.record_encode_failure();
                    consecutive_failures += 1;
                    warn!(
                        timestamp_ms = buffer.timestamp_ms,
                        consecutive_failures, "dropping unencodable audio buffer: {err}"
                    );
                    if consecutive_failures >= self.encode_failure_limit {
                        self.failures.raise(LiveError::Encoding(format!(
                            "{consecutive_failures} consecutive audio encode failures: {err}"
                        )));
                        break;
                    }
                }
            }
        }

        debug!("audio pipeline stopped");
    }
}
