//! Format Module
//!
//! On-disk records of a stripestore table.
//!
//! ## Data Region (append-only)
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Stripe 0                                                 │
//! │   [skip list col 0] ... [skip list col N-1]              │
//! │   col 0: [exists blk 0..B] [values blk 0..B]             │
//! │   ...                                                    │
//! │   col N-1: [exists blk 0..B] [values blk 0..B]           │
//! │   [stripe footer]                                        │
//! ├──────────────────────────────────────────────────────────┤
//! │ Stripe 1 ...                                             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Footer Region (fixed-capacity blocks)
//! ```text
//! block 0      : pointer record  [StartingBlock: u32][BlockCount: u32]
//! block 1..    : footer blob     [TotalLen: u32][TableFooter][PostScript][PsLen: u8]
//! ```

mod pointer;
mod skip_list;
mod table_footer;

pub use pointer::FooterPointer;
pub use skip_list::{deserialize_skip_list, serialize_skip_list, MinMax, SkipNode, StripeFooter};
pub use table_footer::{
    blob_length, decode_footer_blob, encode_footer_blob, PostScript, StripeMetadata,
    TableFooterRecord,
};

// =============================================================================
// Shared Constants
// =============================================================================

/// Magic bytes identifying a stripestore footer
pub(crate) const MAGIC: &[u8; 4] = b"CSTR";

/// Current footer format version
pub(crate) const VERSION: u16 = 1;

/// Footer block that always holds the pointer record
pub const POINTER_BLOCK: u32 = 0;

/// First block a footer blob may occupy
pub const FIRST_FOOTER_BLOCK: u32 = 1;

/// Size of the length prefix at the start of a footer blob
pub(crate) const BLOB_LENGTH_SIZE: usize = 4;

/// Size of the trailing postscript-length byte
pub(crate) const POSTSCRIPT_SIZE_LENGTH: usize = 1;

/// The postscript length must fit in its single trailing byte
pub(crate) const POSTSCRIPT_SIZE_MAX: usize = 256;
