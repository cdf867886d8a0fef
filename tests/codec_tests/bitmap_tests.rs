//! Tests for exists bitmaps
//!
//! These tests verify:
//! - Packed length is ceil(rows / 8)
//! - Little-endian bit order within each byte
//! - Unpacking restores the flags and rejects wrong lengths

use stripestore::codec::{deserialize_bool_array, serialize_bool_array};
use stripestore::StripeError;

// =============================================================================
// Packing Tests
// =============================================================================

#[test]
fn test_empty_bitmap() {
    assert!(serialize_bool_array(&[]).is_empty());
}

#[test]
fn test_bitmap_length_is_ceil_of_rows() {
    assert_eq!(serialize_bool_array(&[true; 1]).len(), 1);
    assert_eq!(serialize_bool_array(&[true; 8]).len(), 1);
    assert_eq!(serialize_bool_array(&[true; 9]).len(), 2);
    assert_eq!(serialize_bool_array(&[false; 16]).len(), 2);
    assert_eq!(serialize_bool_array(&[false; 17]).len(), 3);
}

#[test]
fn test_bitmap_little_endian_bit_order() {
    // rows 0, 2 and 9 present
    let mut flags = vec![false; 10];
    flags[0] = true;
    flags[2] = true;
    flags[9] = true;

    let packed = serialize_bool_array(&flags);

    assert_eq!(packed.as_ref(), &[0b0000_0101, 0b0000_0010]);
}

#[test]
fn test_all_null_block_packs_to_zeros() {
    let packed = serialize_bool_array(&[false; 12]);
    assert!(packed.iter().all(|&b| b == 0));
}

// =============================================================================
// Unpacking Tests
// =============================================================================

#[test]
fn test_unpack_restores_flags() {
    let flags: Vec<bool> = (0..21).map(|i| i % 3 != 1).collect();

    let packed = serialize_bool_array(&flags);
    let unpacked = deserialize_bool_array(&packed, flags.len()).unwrap();

    assert_eq!(unpacked, flags);
}

#[test]
fn test_unpack_ignores_padding_bits() {
    // Stray bits past row 3 must not turn into extra rows
    let unpacked = deserialize_bool_array(&[0xff], 3).unwrap();
    assert_eq!(unpacked, vec![true, true, true]);
}

#[test]
fn test_unpack_rejects_wrong_length() {
    let result = deserialize_bool_array(&[0xff, 0xff], 8);
    assert!(matches!(result, Err(StripeError::Corruption(_))));
}
