//! # stripestore
//!
//! The write path of a columnar on-disk format:
//! - Rows buffered into stripes, stripes cut into per-column blocks
//! - Per-block skip-list statistics (row count, min/max) for data skipping
//! - Per-block compression, kept only when it pays off
//! - Append-only stripe data and a crash-safe, relocating table footer
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WriteSession                            │
//! │            (row ingestion, stripe boundaries)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Stripe    │          │   Footer    │
//!   │  Assembler  │          │   Manager   │
//!   └──────┬──────┘          └──────┬──────┘
//!          │ blocks + skip list     │ blob + pointer flip
//!          ▼                        ▼
//!   ┌─────────────────────────────────────┐
//!   │             BlockStore              │
//!   │   (data stream, footer blocks)      │
//!   └─────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod schema;

pub mod codec;
pub mod format;
pub mod stripe;
pub mod store;
pub mod footer;
pub mod session;
pub mod reader;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StripeError, Result};
pub use config::{CompressionType, Config};
pub use schema::{ColumnDescriptor, ColumnType, Schema, Value};
pub use session::{SessionState, WriteSession, WriteSummary};
pub use reader::TableReader;
pub use store::{BlockStore, FileBlockStore, MemoryBlockStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of stripestore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
