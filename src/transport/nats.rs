//! NATS transport for live sessions.
//!
//! Subject layout, per session:
//!   - `aura.live.<id>.open`   request/reply handshake
//!   - `aura.live.<id>.media`  outbound media payloads
//!   - `aura.live.<id>.events` inbound server envelopes
//!   - `aura.live.<id>.closed` close marker published on teardown

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info};

use super::messages::{MediaPayload, SessionAck, SessionClosed, SessionOpen};
use super::{LiveTransport, MediaSender, ServerStream, TransportChannels, TransportError};

const SUBJECT_PREFIX: &str = "aura.live";

fn session_subject(session_id: &str, leaf: &str) -> String {
    format!("{SUBJECT_PREFIX}.{session_id}.{leaf}")
}

/// Live transport over a NATS bus.
pub struct NatsTransport {
    url: String,
    audio_mime_type: String,
    video_mime_type: String,
}

impl NatsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            audio_mime_type: "audio/pcm;rate=16000".to_string(),
            video_mime_type: "image/jpeg".to_string(),
        }
    }

    /// Override the audio format advertised in the handshake.
    pub fn with_audio_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.audio_mime_type = mime_type.into();
        self
    }
}

#[async_trait]
impl LiveTransport for NatsTransport {
    async fn connect(&self, session_id: &str) -> Result<TransportChannels, TransportError> {
        let client = async_nats::connect(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(format!("{}: {e}", self.url)))?;
        debug!(url = %self.url, session_id, "connected to NATS");

        // Subscribe before the handshake so no early event is missed
        let subscriber = client
            .subscribe(session_subject(session_id, "events"))
            .await
            .map_err(|e| TransportError::Connect(format!("subscribe failed: {e}")))?;

        let open = SessionOpen {
            session_id: session_id.to_string(),
            audio_mime_type: self.audio_mime_type.clone(),
            video_mime_type: self.video_mime_type.clone(),
        };
        let request = serde_json::to_vec(&open)
            .map_err(|e| TransportError::Handshake(format!("serialize open: {e}")))?;
        let reply = client
            .request(session_subject(session_id, "open"), request.into())
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        let ack: SessionAck = serde_json::from_slice(&reply.payload)
            .map_err(|e| TransportError::Handshake(format!("unparseable ack: {e}")))?;
        if ack.session_id != session_id {
            return Err(TransportError::Handshake(format!(
                "ack for wrong session: {}",
                ack.session_id
            )));
        }
        if !ack.ready {
            return Err(TransportError::Handshake("endpoint not ready".to_string()));
        }
        info!(session_id, "live session handshake complete");

        Ok(TransportChannels {
            sender: Box::new(NatsMediaSender {
                client,
                session_id: session_id.to_string(),
                media_subject: session_subject(session_id, "media"),
                closed: false,
            }),
            stream: Box::new(NatsServerStream { subscriber }),
        })
    }
}

struct NatsMediaSender {
    client: async_nats::Client,
    session_id: String,
    media_subject: String,
    closed: bool,
}

#[async_trait]
impl MediaSender for NatsMediaSender {
    async fn send(&mut self, payload: &MediaPayload) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| TransportError::Send(format!("serialize payload: {e}")))?;
        self.client
            .publish(self.media_subject.clone(), bytes.into())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let marker = SessionClosed {
            session_id: self.session_id.clone(),
        };
        let bytes = serde_json::to_vec(&marker)
            .map_err(|e| TransportError::Send(format!("serialize close marker: {e}")))?;
        self.client
            .publish(session_subject(&self.session_id, "closed"), bytes.into())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        self.client
            .flush()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        debug!(session_id = %self.session_id, "close marker published");
        Ok(())
    }
}

struct NatsServerStream {
    subscriber: async_nats::Subscriber,
}

#[async_trait]
impl ServerStream for NatsServerStream {
    async fn next(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        self.subscriber
            .next()
            .await
            .map(|message| Ok(message.payload.to_vec()))
    }
}
