//! PCM16 conversion and base64 packaging for microphone audio.

use base64::{engine::general_purpose, Engine as _};

use crate::capture::AudioBuffer;

use super::CodecError;

/// Full-scale factor between f32 samples and 16-bit PCM.
pub const PCM_FULL_SCALE: f32 = 32768.0;

/// A transport-ready audio chunk: base64 PCM16 little-endian.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// MIME type carrying the sample rate, e.g. `audio/pcm;rate=16000`
    pub mime_type: String,
    /// Base64-encoded PCM16-LE bytes
    pub data: String,
    /// Number of samples encoded
    pub sample_count: usize,
    /// Capture timestamp of the source buffer
    pub timestamp_ms: u64,
}

/// Convert f32 samples in `[-1.0, 1.0]` to 16-bit PCM.
///
/// Out-of-range samples are clamped, then scaled by 32768 and truncated
/// toward zero; +1.0 saturates to 32767. A NaN or infinite sample rejects
/// the whole buffer rather than smuggling garbage onto the wire.
pub fn pcm16_from_f32(samples: &[f32]) -> Result<Vec<i16>, CodecError> {
    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            if !s.is_finite() {
                return Err(CodecError::NonFiniteSample(i));
            }
            Ok((s.clamp(-1.0, 1.0) * PCM_FULL_SCALE) as i16)
        })
        .collect()
}

/// Serialize PCM samples as little-endian bytes.
pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Parse little-endian bytes back into PCM samples. Odd trailing bytes
/// are ignored.
pub fn pcm16_from_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Expand PCM samples back to f32 in `[-1.0, 1.0)`.
pub fn f32_from_pcm16(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / PCM_FULL_SCALE).collect()
}

/// Encode a captured buffer into a transport-ready chunk.
pub fn encode_audio_chunk(buffer: &AudioBuffer) -> Result<AudioChunk, CodecError> {
    let pcm = pcm16_from_f32(&buffer.samples)?;
    let bytes = pcm16_to_bytes(&pcm);
    Ok(AudioChunk {
        mime_type: format!("audio/pcm;rate={}", buffer.sample_rate),
        data: general_purpose::STANDARD.encode(&bytes),
        sample_count: buffer.samples.len(),
        timestamp_ms: buffer.timestamp_ms,
    })
}
