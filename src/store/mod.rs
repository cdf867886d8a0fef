//! Store Module
//!
//! The block-store capability the write path persists through.
//!
//! ## Responsibilities
//! - Append stripe bytes to a growable data stream
//! - Read/write fixed-capacity footer blocks, extending the stream on demand
//! - Hold the single overwritten-in-place pointer record (footer block 0)
//! - Make everything written so far durable on `sync`
//!
//! Locking, page caching and write-ahead logging belong to the adapter; the
//! write path only assumes each call is synchronous and atomic.

mod file;
mod memory;

pub use file::FileBlockStore;
pub use memory::{Fault, MemoryBlockStore};

use crate::error::Result;

/// Byte and block persistence used by writers and readers
///
/// All methods take `&self` so one store can be shared as
/// `Arc<dyn BlockStore>` between a write session and readers.
pub trait BlockStore: Send + Sync {
    // -------------------------------------------------------------------------
    // Data stream (append-only)
    // -------------------------------------------------------------------------

    /// Append `bytes` and return the offset they were written at
    fn append_data(&self, bytes: &[u8]) -> Result<u64>;

    fn read_data(&self, offset: u64, len: usize) -> Result<Vec<u8>>;

    fn data_len(&self) -> Result<u64>;

    /// Drop every data byte at or after `len`
    fn truncate_data(&self, len: u64) -> Result<()>;

    // -------------------------------------------------------------------------
    // Footer stream (fixed-capacity blocks)
    // -------------------------------------------------------------------------

    /// Payload bytes one footer block can hold
    fn footer_block_capacity(&self) -> usize;

    /// Number of allocated footer blocks, the pointer block included
    fn footer_block_count(&self) -> Result<u32>;

    /// Replace the payload of `block`, allocating blocks up to it if needed
    fn write_footer_block(&self, block: u32, payload: &[u8]) -> Result<()>;

    fn read_footer_block(&self, block: u32) -> Result<Vec<u8>>;

    // -------------------------------------------------------------------------
    // Pointer record
    // -------------------------------------------------------------------------

    fn write_fixed_pointer(&self, bytes: &[u8]) -> Result<()>;

    /// `None` when no pointer has ever been written
    fn read_fixed_pointer(&self) -> Result<Option<Vec<u8>>>;

    /// Make all previous writes durable
    fn sync(&self) -> Result<()>;
}
