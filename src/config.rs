//! Configuration for stripestore
//!
//! Centralized write configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StripeError};

/// Main configuration for a stripestore table
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for file-backed block stores
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── data.cstore      (append-only stripe bytes)
    ///     └── footer.cstore    (pointer block + footer blocks)
    pub data_dir: PathBuf,

    /// Physical size of one footer block, including its 4-byte length header
    pub footer_block_size: usize,

    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Rows per stripe before it is flushed
    pub stripe_max_row_count: u64,

    /// Rows per block (unit of compression and skip-list statistics)
    pub block_row_count: u32,

    // -------------------------------------------------------------------------
    // Compression Configuration
    // -------------------------------------------------------------------------
    /// Codec attempted on every sealed block
    pub compression: CompressionType,
}

/// Requested block compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// Store value buffers raw
    None,

    /// Try LZ4 on every block, keep it only when it shrinks the block
    Lz4,
}

impl std::str::FromStr for CompressionType {
    type Err = StripeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionType::None),
            "lz4" => Ok(CompressionType::Lz4),
            other => Err(StripeError::Config(format!(
                "Unknown compression type: {}",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./stripestore_data"),
            footer_block_size: 8192,
            stripe_max_row_count: 150_000,
            block_row_count: 10_000,
            compression: CompressionType::None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the layout parameters can produce a valid table
    pub fn validate(&self) -> Result<()> {
        if self.block_row_count == 0 {
            return Err(StripeError::Config(
                "block_row_count must be positive".to_string(),
            ));
        }
        if self.stripe_max_row_count == 0 {
            return Err(StripeError::Config(
                "stripe_max_row_count must be positive".to_string(),
            ));
        }
        // 4-byte block header plus at least one payload byte
        if self.footer_block_size <= 4 {
            return Err(StripeError::Config(format!(
                "footer_block_size {} leaves no room for payload",
                self.footer_block_size
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for file-backed stores)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the physical footer block size (in bytes)
    pub fn footer_block_size(mut self, size: usize) -> Self {
        self.config.footer_block_size = size;
        self
    }

    /// Set the number of rows per stripe
    pub fn stripe_max_row_count(mut self, count: u64) -> Self {
        self.config.stripe_max_row_count = count;
        self
    }

    /// Set the number of rows per block
    pub fn block_row_count(mut self, count: u32) -> Self {
        self.config.block_row_count = count;
        self
    }

    /// Set the block compression codec
    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.config.compression = compression;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
