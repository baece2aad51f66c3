//! In-process transport for tests and the loopback demo.
//!
//! [`MemoryTransport::pair`] returns a transport plus a [`RemoteHandle`]
//! that plays the endpoint: it observes every payload the session sends
//! and can inject server envelopes (or raw bytes) into the inbound
//! stream. One pair carries exactly one session.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::messages::{MediaPayload, ServerEnvelope};
use super::{LiveTransport, MediaSender, ServerStream, TransportChannels, TransportError};

const MEDIA_CAPACITY: usize = 256;
const EVENT_CAPACITY: usize = 64;

struct Halves {
    media_tx: mpsc::Sender<MediaPayload>,
    event_rx: mpsc::Receiver<Vec<u8>>,
}

/// Loopback transport; the "endpoint" is a [`RemoteHandle`] in the same
/// process.
pub struct MemoryTransport {
    halves: Mutex<Option<Halves>>,
    handshake_delay: Option<Duration>,
}

impl MemoryTransport {
    /// Create a connected transport/endpoint pair.
    pub fn pair() -> (Self, RemoteHandle) {
        let (media_tx, media_rx) = mpsc::channel(MEDIA_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
        let transport = Self {
            halves: Mutex::new(Some(Halves { media_tx, event_rx })),
            handshake_delay: None,
        };
        let remote = RemoteHandle {
            media_rx,
            event_tx: Some(event_tx),
        };
        (transport, remote)
    }

    /// Delay the handshake, for exercising connect timeouts and
    /// cancellation.
    pub fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = Some(delay);
        self
    }
}

#[async_trait]
impl LiveTransport for MemoryTransport {
    async fn connect(&self, _session_id: &str) -> Result<TransportChannels, TransportError> {
        if let Some(delay) = self.handshake_delay {
            tokio::time::sleep(delay).await;
        }
        let halves = self
            .halves
            .lock()
            .await
            .take()
            .ok_or_else(|| TransportError::Connect("pair already used".to_string()))?;
        Ok(TransportChannels {
            sender: Box::new(MemorySender {
                tx: Some(halves.media_tx),
            }),
            stream: Box::new(MemoryServerStream {
                rx: halves.event_rx,
            }),
        })
    }
}

struct MemorySender {
    tx: Option<mpsc::Sender<MediaPayload>>,
}

#[async_trait]
impl MediaSender for MemorySender {
    async fn send(&mut self, payload: &MediaPayload) -> Result<(), TransportError> {
        match &self.tx {
            Some(tx) => tx
                .send(payload.clone())
                .await
                .map_err(|_| TransportError::Send("remote handle dropped".to_string())),
            None => Err(TransportError::Closed),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }
}

struct MemoryServerStream {
    rx: mpsc::Receiver<Vec<u8>>,
}

#[async_trait]
impl ServerStream for MemoryServerStream {
    async fn next(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}

/// The endpoint's side of a [`MemoryTransport`] pair.
pub struct RemoteHandle {
    media_rx: mpsc::Receiver<MediaPayload>,
    event_tx: Option<mpsc::Sender<Vec<u8>>>,
}

impl RemoteHandle {
    /// Next payload the session sent; `None` once the sender is closed.
    pub async fn next_payload(&mut self) -> Option<MediaPayload> {
        self.media_rx.recv().await
    }

    /// Non-blocking variant of [`next_payload`](Self::next_payload).
    pub fn try_next_payload(&mut self) -> Option<MediaPayload> {
        self.media_rx.try_recv().ok()
    }

    /// Inject a server envelope into the session's inbound stream.
    /// Returns false if the session is gone.
    pub async fn push_envelope(&self, envelope: &ServerEnvelope) -> bool {
        match serde_json::to_vec(envelope) {
            Ok(bytes) => self.push_raw(bytes).await,
            Err(_) => false,
        }
    }

    /// Inject raw bytes, valid JSON or not.
    pub async fn push_raw(&self, bytes: Vec<u8>) -> bool {
        match &self.event_tx {
            Some(tx) => tx.send(bytes).await.is_ok(),
            None => false,
        }
    }

    /// End the inbound stream, as if the endpoint hung up.
    pub fn hang_up(&mut self) {
        self.event_tx = None;
    }
}
