//! Exists bitmap
//!
//! Packs one flag per row slot, little-endian bit order within each byte.

use bytes::Bytes;

use crate::error::{Result, StripeError};

/// Pack `flags` into `ceil(len / 8)` bytes; bit `i % 8` of byte `i / 8` is flag `i`
pub fn serialize_bool_array(flags: &[bool]) -> Bytes {
    let mut packed = vec![0u8; flags.len().div_ceil(8)];

    for (i, &flag) in flags.iter().enumerate() {
        if flag {
            packed[i / 8] |= 1 << (i % 8);
        }
    }

    Bytes::from(packed)
}

/// Unpack `len` flags from a bitmap produced by [`serialize_bool_array`]
pub fn deserialize_bool_array(packed: &[u8], len: usize) -> Result<Vec<bool>> {
    let expected = len.div_ceil(8);
    if packed.len() != expected {
        return Err(StripeError::Corruption(format!(
            "exists bitmap for {} rows must be {} bytes, got {}",
            len,
            expected,
            packed.len()
        )));
    }

    Ok((0..len).map(|i| packed[i / 8] & (1 << (i % 8)) != 0).collect())
}
