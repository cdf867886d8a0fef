//! Codec Module
//!
//! Byte-level encodings used inside a block.
//!
//! ## Responsibilities
//! - Serialize single datums into an aligned value buffer
//! - Pack per-row existence flags into a bitmap
//! - Decide per block whether the value buffer is stored compressed
//!
//! ## Block Buffers
//! ```text
//! exists: [b7..b0][b15..b8]...        bit i set iff row i is non-null
//! values: [datum0|pad][datum1|pad]... non-null datums only, each padded
//!                                     to the column alignment
//! ```

pub mod bitmap;
pub mod compression;
pub mod value;

pub use bitmap::{deserialize_bool_array, serialize_bool_array};
pub use compression::{Codec, CompressionKind, CompressionStage, Lz4Codec};
pub use value::{datum_length, deserialize_datums, serialize_datum};
