//! Inbound relay task: server envelopes in, transcript entries out.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::transport::{ServerEnvelope, ServerStream};

use super::error::{FailureSignal, LiveError};
use super::transcript::Transcript;

/// Reads the transport's inbound half and appends reply text to the
/// transcript.
///
/// Deltas are appended strictly in stream arrival order; within one
/// envelope, in array order. A message that fails to parse is logged and
/// skipped so one garbled frame cannot kill the session. The stream
/// ending while the session is live is a transport failure; ending
/// during teardown is just the session closing.
pub(crate) struct InboundRelay {
    pub stream: Box<dyn ServerStream>,
    pub transcript: Arc<Transcript>,
    pub shutdown: watch::Receiver<bool>,
    pub failures: FailureSignal,
}

impl InboundRelay {
    pub(crate) async fn run(mut self) {
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
                item = self.stream.next() => match item {
                    Some(Ok(bytes)) => self.handle_message(&bytes).await,
                    Some(Err(err)) => {
                        if !*self.shutdown.borrow() {
                            self.failures.raise(LiveError::Transport(format!(
                                "inbound stream failed: {err}"
                            )));
                        }
                        break;
                    }
                    None => {
                        if !*self.shutdown.borrow() {
                            self.failures.raise(LiveError::Transport(
                                "endpoint closed the session".to_string(),
                            ));
                        }
                        break;
                    }
                },
            }
        }

        debug!("inbound relay stopped");
    }

    // &mut keeps the borrow held across append() Send-safe; the stream
    // half is Send but not Sync
    async fn handle_message(&mut self, bytes: &[u8]) {
        let envelope: ServerEnvelope = match serde_json::from_slice(bytes) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(len = bytes.len(), "ignoring malformed endpoint message: {err}");
                return;
            }
        };

        for text in envelope.text_deltas() {
            self.transcript.append(text).await;
        }
        if envelope.turn_complete {
            debug!("endpoint reply turn complete");
        }
    }
}
