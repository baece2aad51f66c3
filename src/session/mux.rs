//! Outbound multiplexer: the single writer on the transport.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

use crate::codec::OutboundEnvelope;
use crate::transport::{MediaPayload, MediaSender};

use super::error::{FailureSignal, LiveError};
use super::stats::SessionCounters;

const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Queue a chunk without waiting.
///
/// This is the only way producers hand media to the multiplexer. A full
/// queue drops the chunk in hand (the newest) and keeps the backlog
/// intact; arrival order of what was accepted is preserved. Returns
/// false once the multiplexer is gone.
pub(crate) fn enqueue(
    outbound: &mpsc::Sender<OutboundEnvelope>,
    envelope: OutboundEnvelope,
    counters: &SessionCounters,
) -> bool {
    let is_audio = matches!(envelope, OutboundEnvelope::Audio(_));
    match outbound.try_send(envelope) {
        Ok(()) => {
            if is_audio {
                counters.record_audio_chunk();
            } else {
                counters.record_video_chunk();
            }
            true
        }
        Err(mpsc::error::TrySendError::Full(envelope)) => {
            counters.record_drop();
            trace!(kind = envelope.kind_name(), "outbound queue full, dropping chunk");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Drains the outbound queue onto the transport's write half.
///
/// Owning the [`MediaSender`] makes this task the session's single
/// writer; chunks leave in the order they were accepted, whatever mix of
/// audio and video the producers queued. The half is closed exactly once,
/// on the way out, no matter why the task exits.
pub(crate) struct OutboundMux {
    pub outbound_rx: mpsc::Receiver<OutboundEnvelope>,
    pub sender: Box<dyn MediaSender>,
    pub shutdown: watch::Receiver<bool>,
    pub failures: FailureSignal,
    pub send_retry_limit: u32,
}

impl OutboundMux {
    pub(crate) async fn run(mut self) {
        let mut sent: u64 = 0;

        'main: loop {
            // The flag may predate our subscription, in which case
            // changed() never fires
            if *self.shutdown.borrow() {
                break;
            }
            let envelope = tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                maybe = self.outbound_rx.recv() => match maybe {
                    Some(envelope) => envelope,
                    None => break,
                },
            };

            let kind = envelope.kind_name();
            let payload = MediaPayload::from(envelope);
            let mut attempts = 0u32;
            loop {
                tokio::select! {
                    changed = self.shutdown.changed() => {
                        if changed.is_err() || *self.shutdown.borrow() {
                            break 'main;
                        }
                    }
                    result = self.sender.send(&payload) => match result {
                        Ok(()) => {
                            sent += 1;
                            break;
                        }
                        Err(err) => {
                            attempts += 1;
                            warn!(kind, attempts, "media send failed: {err}");
                            if attempts >= self.send_retry_limit {
                                self.failures.raise(LiveError::Transport(format!(
                                    "send failed after {attempts} attempts: {err}"
                                )));
                                break 'main;
                            }
                            tokio::time::sleep(RETRY_DELAY).await;
                        }
                    },
                }
            }
        }

        // Sole close point for the write half
        if let Err(err) = self.sender.close().await {
            warn!("failed to close media sender: {err}");
        }
        debug!(sent, "outbound multiplexer stopped");
    }
}
