//! Media encoding for the outbound leg of a live session.
//!
//! Raw capture output is turned into transport-ready chunks here: f32
//! microphone buffers become base64 PCM16, camera frames become base64
//! JPEG. Both directions of the conversion live in this module so tests
//! and tooling can decode what the session encodes.

pub mod audio;
pub mod video;

pub use audio::{
    encode_audio_chunk, f32_from_pcm16, pcm16_from_bytes, pcm16_from_f32, pcm16_to_bytes,
    AudioChunk,
};
pub use video::{encode_video_chunk, VideoChunk};

/// Errors raised while encoding captured media.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A sample was NaN or infinite; the buffer is rejected whole.
    #[error("non-finite sample at index {0}")]
    NonFiniteSample(usize),
    /// Frame dimensions and pixel data disagree.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// The JPEG encoder rejected the frame.
    #[error("jpeg encoding failed: {0}")]
    Jpeg(#[from] ::image::ImageError),
}

/// One encoded chunk on its way to the transport.
///
/// Producers wrap their output in an envelope and push it onto the
/// session's outbound queue; the multiplexer unwraps it into the wire
/// payload.
#[derive(Debug, Clone)]
pub enum OutboundEnvelope {
    Audio(AudioChunk),
    Video(VideoChunk),
}

impl OutboundEnvelope {
    /// Short label for logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            OutboundEnvelope::Audio(_) => "audio",
            OutboundEnvelope::Video(_) => "video",
        }
    }
}
