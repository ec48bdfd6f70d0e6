//! PCM16 encoding and wire helpers
//!
//! Float samples in [-1, 1] map onto the full two's-complement range:
//! negative values scale by 32768 and positive values by 32767, so -1.0
//! becomes -32768 and 1.0 becomes 32767.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{AudioError, Result};

/// Encode one normalized float sample
///
/// Out-of-range input saturates, NaN encodes as silence.
#[inline]
pub fn encode_sample(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let clamped = sample.clamp(-1.0, 1.0);
    let scale = if clamped < 0.0 { 32768.0 } else { 32767.0 };
    (clamped * scale).round() as i16
}

/// Encode a block of normalized float samples
pub fn encode(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| encode_sample(s)).collect()
}

/// Serialize samples as little-endian bytes
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Parse little-endian bytes back into samples
pub fn from_le_bytes(bytes: &[u8]) -> Result<Vec<i16>> {
    if !bytes.len().is_multiple_of(2) {
        return Err(AudioError::invalid_payload(format!(
            "PCM16 payload length must be even, got {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// One fixed-format output frame: mono PCM16 at the target rate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pcm16Chunk {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl Pcm16Chunk {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        to_le_bytes(&self.samples)
    }

    pub fn from_le_bytes(bytes: &[u8], sample_rate: u32) -> Result<Self> {
        Ok(Self::new(from_le_bytes(bytes)?, sample_rate))
    }

    /// Base64 (standard alphabet) of the little-endian bytes, as JSON
    /// realtime protocols expect for `input_audio_buffer.append`-style messages
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_le_bytes())
    }

    pub fn from_base64(encoded: &str, sample_rate: u32) -> Result<Self> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| AudioError::invalid_payload(format!("Invalid base64 audio: {}", e)))?;
        Self::from_le_bytes(&bytes, sample_rate)
    }
}
