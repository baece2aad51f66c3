//! Frame sampler task: periodic camera snapshots, JPEG-compressed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::capture::FrameSource;
use crate::codec::{encode_video_chunk, OutboundEnvelope};

use super::error::{FailureSignal, LiveError};
use super::mux::enqueue;
use super::stats::SessionCounters;

/// Samples the camera on a fixed interval and queues JPEG chunks.
///
/// Frames are pulled, not pushed: each tick takes whatever the camera
/// currently shows. Ticks that land while the camera is still warming up
/// are skipped quietly, and a missed tick is simply dropped rather than
/// replayed in a burst.
pub(crate) struct FrameSampler {
    pub frames: Arc<dyn FrameSource>,
    pub outbound: mpsc::Sender<OutboundEnvelope>,
    pub shutdown: watch::Receiver<bool>,
    pub failures: FailureSignal,
    pub counters: Arc<SessionCounters>,
    pub frame_interval: Duration,
    pub jpeg_quality: u8,
    pub max_frame_width: u32,
    pub encode_failure_limit: u32,
}

impl FrameSampler {
    pub(crate) async fn run(mut self) {
        let mut ticker = interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut consecutive_failures = 0u32;

        loop {
            // The flag may predate our subscription, in which case
            // changed() never fires
            if *self.shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let Some(frame) = self.frames.latest_frame() else {
                        trace!("camera not ready, skipping frame tick");
                        continue;
                    };

                    match encode_video_chunk(&frame, self.jpeg_quality, self.max_frame_width) {
                        Ok(chunk) => {
                            consecutive_failures = 0;
                            if !enqueue(&self.outbound, OutboundEnvelope::Video(chunk), &self.counters) {
                                break;
                            }
                        }
                        Err(err) => {
                            self.counters.record_encode_failure();
                            consecutive_failures += 1;
                            warn!(
                                width = frame.width,
                                height = frame.height,
                                consecutive_failures, "dropping unencodable frame: {err}"
                            );
                            if consecutive_failures >= self.encode_failure_limit {
                                self.failures.raise(LiveError::Encoding(format!(
                                    "{consecutive_failures} consecutive frame encode failures: {err}"
                                )));
                                break;
                            }
                        }
                    }
                }
            }
        }

        debug!("frame sampler stopped");
    }
}
