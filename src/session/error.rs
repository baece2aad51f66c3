//! Session-level error taxonomy.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::trace;

use crate::capture::CaptureError;
use crate::codec::CodecError;
use crate::transport::TransportError;

use super::state::ErrorKind;

/// Everything that can end a live session early.
///
/// Boundary errors (capture, codec, transport) are folded into this
/// taxonomy at the session layer; the variant determines the `kind`
/// recorded in the terminal [`Error`](super::SessionState::Error) state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LiveError {
    /// Microphone/camera access was refused; nothing was started.
    #[error("capture access denied: {0}")]
    CapabilityDenied(String),
    /// The endpoint did not answer the session handshake in time.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
    /// The transport failed to connect, send, or receive.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Captured media kept failing to encode.
    #[error("encoding failure: {0}")]
    Encoding(String),
    /// This session instance was already started (or already stopped);
    /// construct a new one to retry.
    #[error("session already started")]
    AlreadyStarted,
}

impl LiveError {
    /// The error kind recorded in the terminal state, if this error
    /// terminates a session.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            LiveError::CapabilityDenied(_) => Some(ErrorKind::CapabilityDenied),
            LiveError::HandshakeTimeout(_) => Some(ErrorKind::HandshakeTimeout),
            LiveError::Transport(_) => Some(ErrorKind::Transport),
            LiveError::Encoding(_) => Some(ErrorKind::Encoding),
            LiveError::AlreadyStarted => None,
        }
    }
}

impl From<CaptureError> for LiveError {
    fn from(err: CaptureError) -> Self {
        match err {
            // Both denial and a missing device mean the capability is
            // not available to this session
            CaptureError::AccessDenied(msg) => LiveError::CapabilityDenied(msg),
            CaptureError::DeviceUnavailable(msg) => LiveError::CapabilityDenied(msg),
            CaptureError::Stream(msg) => LiveError::Transport(format!("capture stream: {msg}")),
        }
    }
}

impl From<TransportError> for LiveError {
    fn from(err: TransportError) -> Self {
        LiveError::Transport(err.to_string())
    }
}

impl From<CodecError> for LiveError {
    fn from(err: CodecError) -> Self {
        LiveError::Encoding(err.to_string())
    }
}

/// Hands a task's fatal error to the session monitor.
///
/// Only the first failure decides the session's fate, so raising into a
/// full or already-closed channel is a silent no-op.
#[derive(Clone)]
pub(crate) struct FailureSignal(mpsc::Sender<LiveError>);

impl FailureSignal {
    pub(crate) fn new(tx: mpsc::Sender<LiveError>) -> Self {
        Self(tx)
    }

    pub(crate) fn raise(&self, error: LiveError) {
        if let Err(err) = self.0.try_send(error) {
            trace!("failure already reported: {err}");
        }
    }
}
