pub mod capture;
pub mod codec;
pub mod config;
pub mod http;
pub mod session;
pub mod transport;

pub use capture::{
    AudioBuffer, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureError,
    CaptureSource, CaptureStreams, FrameSource, RawFrame, SampleChunker, SyntheticBackend,
    WavCaptureBackend,
};
pub use codec::{AudioChunk, CodecError, OutboundEnvelope, VideoChunk};
pub use config::Config;
pub use http::{create_router, AppState, ConfigBoundaries, SessionBoundaries};
pub use session::{
    ErrorKind, LiveError, LiveSession, SessionConfig, SessionState, SessionStats, Transcript,
    TranscriptEntry, TranscriptRole,
};
pub use transport::{
    ContentDelta, LiveTransport, MediaKind, MediaPayload, MediaSender, MemoryTransport,
    NatsTransport, RemoteHandle, ServerEnvelope, ServerStream, SessionAck, SessionClosed,
    SessionOpen, TransportChannels, TransportError,
};
