//! Wire messages exchanged with the live endpoint.
//!
//! All payloads are JSON with camelCase keys. Inbound envelopes are
//! server-defined, so deserialization tolerates missing and unknown
//! fields instead of rejecting messages outright.

use serde::{Deserialize, Serialize};

use crate::codec::OutboundEnvelope;

/// Discriminates outbound media payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// One outbound media message.
///
/// `{"kind":"audio","mimeType":"audio/pcm;rate=16000","data":"<base64>"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    pub kind: MediaKind,
    pub mime_type: String,
    pub data: String,
}

impl From<OutboundEnvelope> for MediaPayload {
    fn from(envelope: OutboundEnvelope) -> Self {
        match envelope {
            OutboundEnvelope::Audio(chunk) => MediaPayload {
                kind: MediaKind::Audio,
                mime_type: chunk.mime_type,
                data: chunk.data,
            },
            OutboundEnvelope::Video(chunk) => MediaPayload {
                kind: MediaKind::Video,
                mime_type: chunk.mime_type,
                data: chunk.data,
            },
        }
    }
}

/// Handshake request sent when opening a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOpen {
    pub session_id: String,
    /// MIME type of outbound audio chunks
    pub audio_mime_type: String,
    /// MIME type of outbound video chunks
    pub video_mime_type: String,
}

/// Handshake acknowledgement from the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAck {
    pub session_id: String,
    #[serde(default)]
    pub ready: bool,
}

/// Final marker published when the client closes a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClosed {
    pub session_id: String,
}

/// One incremental piece of the endpoint's reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentDelta {
    /// Incremental reply text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 reply audio; present when the endpoint speaks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

/// Envelope published by the endpoint on the session's event subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerEnvelope {
    pub deltas: Vec<ContentDelta>,
    /// Set when the endpoint has finished a reply turn
    pub turn_complete: bool,
}

impl ServerEnvelope {
    /// Text deltas in arrival order, skipping empty ones.
    pub fn text_deltas(&self) -> impl Iterator<Item = &str> {
        self.deltas
            .iter()
            .filter_map(|delta| delta.text.as_deref())
            .filter(|text| !text.is_empty())
    }
}
