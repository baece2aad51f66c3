//! Re-packs arbitrarily sized sample slices into fixed-size buffers.

use super::AudioBuffer;

/// Accumulates incoming samples and emits [`AudioBuffer`]s of a constant
/// length, stamping each with its start offset in milliseconds.
///
/// Hardware callbacks and file decoders rarely deliver audio in the exact
/// buffer size the session wants, so backends run their samples through a
/// chunker before handing them off.
pub struct SampleChunker {
    sample_rate: u32,
    buffer_samples: usize,
    pending: Vec<f32>,
    emitted_samples: u64,
}

impl SampleChunker {
    pub fn new(sample_rate: u32, buffer_samples: usize) -> Self {
        Self {
            sample_rate,
            buffer_samples: buffer_samples.max(1),
            pending: Vec::with_capacity(buffer_samples.max(1)),
            emitted_samples: 0,
        }
    }

    /// Feed samples in; get back every complete buffer they fill.
    pub fn push(&mut self, samples: &[f32]) -> Vec<AudioBuffer> {
        self.pending.extend_from_slice(samples);
        let mut complete = Vec::new();
        while self.pending.len() >= self.buffer_samples {
            let rest = self.pending.split_off(self.buffer_samples);
            let full = std::mem::replace(&mut self.pending, rest);
            complete.push(self.stamp(full));
        }
        complete
    }

    /// Emit any trailing partial buffer, zero-padded to the fixed length.
    pub fn flush(&mut self) -> Option<AudioBuffer> {
        if self.pending.is_empty() {
            return None;
        }
        let mut samples = std::mem::take(&mut self.pending);
        samples.resize(self.buffer_samples, 0.0);
        Some(self.stamp(samples))
    }

    /// Samples currently buffered but not yet emitted.
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    fn stamp(&mut self, samples: Vec<f32>) -> AudioBuffer {
        let timestamp_ms = self.emitted_samples * 1000 / self.sample_rate.max(1) as u64;
        self.emitted_samples += samples.len() as u64;
        AudioBuffer {
            samples,
            sample_rate: self.sample_rate,
            timestamp_ms,
        }
    }
}
