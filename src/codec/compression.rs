//! Compression stage
//!
//! Every sealed block's value buffer is offered to the configured codec.
//! The compressed form is kept only when it is strictly smaller than the
//! raw buffer, so one column of one stripe can mix compressed and raw
//! blocks. The outcome is recorded per block in the skip list.

use bytes::Bytes;
use lz4_flex::block::{compress_prepend_size, decompress_size_prepended};
use serde::{Deserialize, Serialize};

use crate::config::CompressionType;
use crate::error::{Result, StripeError};

/// How a block's value buffer is stored on disk
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionKind {
    #[default]
    None = 0,
    Lz4 = 1,
}

/// Pluggable block codec
pub trait Codec: Send + Sync {
    fn kind(&self) -> CompressionKind;

    /// Candidate compressed form; `None` when the codec declines the input
    fn compress(&self, input: &[u8]) -> Option<Vec<u8>>;

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// LZ4 block format with the uncompressed size prepended
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn kind(&self) -> CompressionKind {
        CompressionKind::Lz4
    }

    fn compress(&self, input: &[u8]) -> Option<Vec<u8>> {
        if input.is_empty() {
            return None;
        }
        Some(compress_prepend_size(input))
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        decompress_size_prepended(input)
            .map_err(|e| StripeError::Corruption(format!("lz4 decompress: {}", e)))
    }
}

/// Per-block compress-or-keep-raw decision
pub struct CompressionStage {
    codec: Option<Box<dyn Codec>>,
}

impl CompressionStage {
    pub fn new(compression: CompressionType) -> Self {
        let codec: Option<Box<dyn Codec>> = match compression {
            CompressionType::None => None,
            CompressionType::Lz4 => Some(Box::new(Lz4Codec)),
        };
        Self { codec }
    }

    /// Use a caller-supplied codec
    pub fn with_codec(codec: Box<dyn Codec>) -> Self {
        Self { codec: Some(codec) }
    }

    /// Return the bytes to store and the tag describing them
    pub fn compress(&self, raw: Bytes) -> (Bytes, CompressionKind) {
        let Some(codec) = &self.codec else {
            return (raw, CompressionKind::None);
        };

        match codec.compress(&raw) {
            Some(candidate) if candidate.len() < raw.len() => {
                (Bytes::from(candidate), codec.kind())
            }
            _ => (raw, CompressionKind::None),
        }
    }
}

/// Restore a value buffer stored with `kind`
pub fn decompress(kind: CompressionKind, stored: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(stored.to_vec()),
        CompressionKind::Lz4 => Lz4Codec.decompress(stored),
    }
}
