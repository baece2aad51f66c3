//! Session transport abstraction.
//!
//! A [`LiveTransport`] opens one bidirectional session with the remote
//! endpoint and hands back two independently owned halves: a
//! [`MediaSender`] the multiplexer writes on, and a [`ServerStream`] the
//! inbound relay reads from. Ownership of the halves is what enforces
//! the single-writer and single-reader rules; nothing else in the
//! session ever touches the connection.

pub mod memory;
pub mod messages;
pub mod nats;

pub use memory::{MemoryTransport, RemoteHandle};
pub use messages::{
    ContentDelta, MediaKind, MediaPayload, ServerEnvelope, SessionAck, SessionClosed, SessionOpen,
};
pub use nats::NatsTransport;

/// Errors raised by a session transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not reach the endpoint at all.
    #[error("failed to connect to live endpoint: {0}")]
    Connect(String),
    /// The endpoint refused or garbled the session handshake.
    #[error("session handshake failed: {0}")]
    Handshake(String),
    /// A media write failed.
    #[error("send failed: {0}")]
    Send(String),
    /// The inbound stream failed.
    #[error("receive failed: {0}")]
    Receive(String),
    /// The session was closed underneath us.
    #[error("transport closed")]
    Closed,
}

/// Write half of a live session. Owned by exactly one task.
#[async_trait::async_trait]
pub trait MediaSender: Send {
    /// Write one media payload to the endpoint.
    async fn send(&mut self, payload: &MediaPayload) -> Result<(), TransportError>;

    /// Tell the endpoint the session is over and release the half.
    /// Idempotent; sends after close fail with [`TransportError::Closed`].
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a live session. Owned by exactly one task.
#[async_trait::async_trait]
pub trait ServerStream: Send {
    /// Next raw message from the endpoint, or `None` once the stream ends.
    async fn next(&mut self) -> Option<Result<Vec<u8>, TransportError>>;
}

/// The two halves of an open session.
pub struct TransportChannels {
    pub sender: Box<dyn MediaSender>,
    pub stream: Box<dyn ServerStream>,
}

/// Opens live sessions with the remote endpoint.
#[async_trait::async_trait]
pub trait LiveTransport: Send + Sync {
    /// Perform the session handshake and return the open halves.
    ///
    /// Implementations should fail fast; the caller enforces its own
    /// deadline on top and treats overruns as a handshake timeout.
    async fn connect(&self, session_id: &str) -> Result<TransportChannels, TransportError>;
}
