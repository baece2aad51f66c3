//! JPEG packaging for sampled camera frames.
//!
//! Frames ride the same wire as audio, so they are downscaled and
//! compressed at reduced quality before encoding. A 640px-wide JPEG at
//! quality 60 is plenty for the endpoint's vision input and keeps frame
//! payloads in the low tens of kilobytes.

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::capture::RawFrame;

use super::CodecError;

/// A transport-ready video chunk: base64 JPEG.
#[derive(Debug, Clone)]
pub struct VideoChunk {
    /// Always `image/jpeg`
    pub mime_type: String,
    /// Base64-encoded JPEG bytes
    pub data: String,
    /// Encoded width after any downscale
    pub width: u32,
    /// Encoded height after any downscale
    pub height: u32,
    /// Capture timestamp of the source frame
    pub captured_at_ms: u64,
}

/// Compress a raw frame to JPEG, downscaling to `max_width` if needed.
///
/// Aspect ratio is preserved; frames already narrow enough are encoded
/// as-is (never upscaled).
pub fn encode_video_chunk(
    frame: &RawFrame,
    quality: u8,
    max_width: u32,
) -> Result<VideoChunk, CodecError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(CodecError::MalformedFrame(format!(
            "zero dimension: {}x{}",
            frame.width, frame.height
        )));
    }
    let expected = frame.width as usize * frame.height as usize * 3;
    if frame.pixels.len() != expected {
        return Err(CodecError::MalformedFrame(format!(
            "{}x{} frame needs {expected} bytes, got {}",
            frame.width,
            frame.height,
            frame.pixels.len()
        )));
    }

    let image: RgbImage = RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .ok_or_else(|| CodecError::MalformedFrame("pixel buffer too small".to_string()))?;

    let image = if max_width > 0 && frame.width > max_width {
        let scaled_height =
            ((frame.height as u64 * max_width as u64) / frame.width as u64).max(1) as u32;
        imageops::resize(&image, max_width, scaled_height, FilterType::Triangle)
    } else {
        image
    };

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
    encoder.encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgb8)?;

    Ok(VideoChunk {
        mime_type: "image/jpeg".to_string(),
        data: general_purpose::STANDARD.encode(&jpeg),
        width: image.width(),
        height: image.height(),
        captured_at_ms: frame.timestamp_ms,
    })
}
