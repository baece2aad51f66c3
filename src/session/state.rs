//! Session lifecycle states and the legal transitions between them.

use serde::{Deserialize, Serialize};

/// Why a session landed in [`SessionState::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Microphone/camera access was refused
    CapabilityDenied,
    /// The endpoint did not complete the handshake in time
    HandshakeTimeout,
    /// The connection failed mid-session
    Transport,
    /// Captured media could not be encoded
    Encoding,
}

/// Lifecycle state of a live session.
///
/// A session instance moves strictly forward: `Idle` to `Connecting` to
/// `Active`, then to `Idle` (clean close) or `Error` (failure). Both
/// outcomes are final for the instance; retrying means constructing a
/// new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Error { kind: ErrorKind, message: String },
}

impl SessionState {
    /// Whether `next` is a legal successor of this state.
    pub fn can_transition(&self, next: &SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Active)
                | (Connecting, Idle)
                | (Connecting, Error { .. })
                | (Active, Idle)
                | (Active, Error { .. })
        )
    }

    /// A session that is connecting or streaming.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Active)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SessionState::Error { .. })
    }

    /// Short label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Error { .. } => "error",
        }
    }
}
