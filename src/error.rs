//! Error types for stripestore
//!
//! Provides a unified error type for all write-path and read-path operations.

use thiserror::Error;

/// Result type alias using StripeError
pub type Result<T> = std::result::Result<T, StripeError>;

/// Unified error type for stripestore operations
#[derive(Debug, Error)]
pub enum StripeError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Block Store Errors
    // -------------------------------------------------------------------------
    #[error("Block store error: {0}")]
    Storage(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Row / Value Errors
    // -------------------------------------------------------------------------
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Row has {actual} columns, schema has {expected}")]
    SchemaMismatch { expected: usize, actual: usize },

    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    #[error("Write session is poisoned by an earlier failure")]
    SessionPoisoned,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for StripeError {
    fn from(e: bincode::Error) -> Self {
        StripeError::Serialization(e.to_string())
    }
}
