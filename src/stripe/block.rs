//! Block accumulator
//!
//! Staging area for the block a column is currently filling.

use bytes::{Bytes, BytesMut};

use crate::codec::{serialize_bool_array, serialize_datum, CompressionKind, CompressionStage};
use crate::error::Result;
use crate::schema::ColumnDescriptor;

/// A finished block, ready to be laid out in its stripe
#[derive(Debug, Clone)]
pub struct SealedBlock {
    pub row_count: u32,
    /// Packed exists bitmap, `ceil(row_count / 8)` bytes
    pub exists: Bytes,
    /// Value buffer as stored (compressed when `compression` says so)
    pub values: Bytes,
    pub compression: CompressionKind,
}

/// Exists flags and serialized values of one column's active block
pub struct BlockAccumulator {
    exists: Vec<bool>,
    values: BytesMut,
}

impl BlockAccumulator {
    pub fn new(block_row_count: u32) -> Self {
        Self {
            exists: Vec::with_capacity(block_row_count as usize),
            values: BytesMut::new(),
        }
    }

    pub fn record_null(&mut self) {
        self.exists.push(false);
    }

    pub fn record_value(&mut self, datum: &[u8], column: &ColumnDescriptor) -> Result<()> {
        serialize_datum(&mut self.values, datum, column)?;
        self.exists.push(true);
        Ok(())
    }

    pub fn row_count(&self) -> u32 {
        self.exists.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.exists.is_empty()
    }

    /// Raw (uncompressed) value bytes staged so far
    pub fn value_len(&self) -> usize {
        self.values.len()
    }

    /// Freeze the block and reset the accumulator for the next one
    pub fn seal(&mut self, compression: &CompressionStage) -> SealedBlock {
        assert!(!self.is_empty(), "sealing a block with no rows");

        let row_count = self.row_count();
        let exists = serialize_bool_array(&self.exists);
        let (values, kind) = compression.compress(self.values.split().freeze());
        self.exists.clear();

        SealedBlock {
            row_count,
            exists,
            values,
            compression: kind,
        }
    }
}
