//! Value codec
//!
//! Serializes single datums into a block's value buffer. The zero padding
//! after each datum is part of the on-disk format: readers step over it
//! using the same alignment rule.

use bytes::{BufMut, BytesMut};

use crate::error::{Result, StripeError};
use crate::schema::{ColumnDescriptor, ColumnLength, VARLENA_HEADER_SIZE};

/// Validate `datum` against `column` and return its unpadded length
pub fn datum_length(datum: &[u8], column: &ColumnDescriptor) -> Result<usize> {
    match column.length {
        ColumnLength::Fixed(len) => {
            if datum.len() != len {
                return Err(StripeError::InvalidValue(format!(
                    "column {} expects {} byte datums, got {}",
                    column.index,
                    len,
                    datum.len()
                )));
            }
            Ok(len)
        }
        ColumnLength::Variable => varlena_length(datum, column.index),
    }
}

/// Append `datum` to `buf`, zero-padded to the column alignment
///
/// Returns the number of bytes appended (padding included).
pub fn serialize_datum(buf: &mut BytesMut, datum: &[u8], column: &ColumnDescriptor) -> Result<usize> {
    let len = datum_length(datum, column)?;
    let aligned = column.alignment.align(len);

    buf.reserve(aligned);
    buf.put_slice(&datum[..len]);
    buf.put_bytes(0, aligned - len);

    Ok(aligned)
}

/// Split a decoded value buffer back into one entry per row slot
///
/// `exists[i] == false` yields `None`; every present slot consumes one
/// padded datum from `values`.
pub fn deserialize_datums(
    values: &[u8],
    exists: &[bool],
    column: &ColumnDescriptor,
) -> Result<Vec<Option<Vec<u8>>>> {
    let mut datums = Vec::with_capacity(exists.len());
    let mut pos = 0usize;

    for &present in exists {
        if !present {
            datums.push(None);
            continue;
        }

        let rest = values.get(pos..).unwrap_or_default();
        let len = match column.length {
            ColumnLength::Fixed(len) => len,
            ColumnLength::Variable => varlena_length(rest, column.index)
                .map_err(|e| StripeError::Corruption(e.to_string()))?,
        };

        if rest.len() < len {
            return Err(StripeError::Corruption(format!(
                "column {}: value buffer ends at {} but datum needs {} more bytes",
                column.index,
                values.len(),
                len
            )));
        }

        datums.push(Some(rest[..len].to_vec()));
        pos += column.alignment.align(len).min(rest.len());
    }

    if pos != values.len() {
        return Err(StripeError::Corruption(format!(
            "column {}: {} trailing bytes after last datum",
            column.index,
            values.len() - pos
        )));
    }

    Ok(datums)
}

/// Length announced by a variable-length header, checked against the slice
fn varlena_length(datum: &[u8], column_index: usize) -> Result<usize> {
    if datum.len() < VARLENA_HEADER_SIZE {
        return Err(StripeError::InvalidValue(format!(
            "column {}: variable-length datum needs a {} byte header, got {} bytes",
            column_index,
            VARLENA_HEADER_SIZE,
            datum.len()
        )));
    }

    let mut header = [0u8; VARLENA_HEADER_SIZE];
    header.copy_from_slice(&datum[..VARLENA_HEADER_SIZE]);
    let len = u32::from_le_bytes(header) as usize;

    if len < VARLENA_HEADER_SIZE || len > datum.len() {
        return Err(StripeError::InvalidValue(format!(
            "column {}: header announces {} bytes, datum has {}",
            column_index,
            len,
            datum.len()
        )));
    }

    Ok(len)
}
