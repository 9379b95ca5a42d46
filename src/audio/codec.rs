//! PCM codec for the live voice endpoint
//!
//! The endpoint consumes little-endian 16-bit PCM, base64-encoded and tagged
//! with a MIME-style rate descriptor, and emits inbound audio in the same
//! framing at a higher rate. Conversion is pure and allocation-per-chunk only.

use crate::error::SessionError;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// A base64-framed PCM16 chunk, ready to send or just received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaChunk {
    /// Base64-encoded little-endian i16 samples
    pub data: String,
    /// MIME-style descriptor, e.g. "audio/pcm;rate=16000"
    pub mime_type: String,
}

impl MediaChunk {
    pub fn mime_for_rate(rate: u32) -> String {
        format!("audio/pcm;rate={}", rate)
    }
}

/// Encode one capture frame of float samples into a sendable chunk.
///
/// Samples are quantized with `round(s * 32768)` and clamped to the i16
/// range, so out-of-range input saturates instead of wrapping.
pub fn encode_frame(samples: &[f32], sample_rate: u32) -> MediaChunk {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let q = (s * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&q.to_le_bytes());
    }

    MediaChunk {
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        mime_type: MediaChunk::mime_for_rate(sample_rate),
    }
}

/// Decode an inbound chunk back into float samples.
pub fn decode_chunk(chunk: &MediaChunk) -> Result<Vec<f32>, SessionError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&chunk.data)
        .map_err(|e| SessionError::Decode(format!("invalid base64: {}", e)))?;

    if bytes.len() % 2 != 0 {
        return Err(SessionError::Decode(format!(
            "odd PCM16 byte count: {}",
            bytes.len()
        )));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect();

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_within_quantization_error() {
        let samples: Vec<f32> = (0..4096).map(|i| ((i as f32) / 2048.0) - 1.0).collect();
        let chunk = encode_frame(&samples, 16000);
        let decoded = decode_chunk(&chunk).unwrap();

        assert_eq!(decoded.len(), samples.len());
        for (orig, got) in samples.iter().zip(decoded.iter()) {
            assert!(
                (orig - got).abs() <= 1.0 / 32768.0,
                "sample {} decoded as {}",
                orig,
                got
            );
        }
    }

    #[test]
    fn out_of_range_samples_saturate() {
        let chunk = encode_frame(&[2.0, -2.0], 16000);
        let decoded = decode_chunk(&chunk).unwrap();
        assert!((decoded[0] - (32767.0 / 32768.0)).abs() < 1e-6);
        assert!((decoded[1] - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn mime_tag_carries_rate() {
        let chunk = encode_frame(&[0.0], 16000);
        assert_eq!(chunk.mime_type, "audio/pcm;rate=16000");
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        let chunk = MediaChunk {
            data: "not base64!!!".to_string(),
            mime_type: MediaChunk::mime_for_rate(24000),
        };
        assert!(decode_chunk(&chunk).is_err());
    }

    #[test]
    fn odd_byte_count_is_a_decode_error() {
        let chunk = MediaChunk {
            data: base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3]),
            mime_type: MediaChunk::mime_for_rate(24000),
        };
        assert!(decode_chunk(&chunk).is_err());
    }
}
