//! Skip list and stripe footer records
//!
//! One skip list per column per stripe, one node per block. Offsets are
//! relative to the start of the column's exists (or values) run inside the
//! stripe's data section, and are only meaningful once the stripe has been
//! flushed.

use serde::{Deserialize, Serialize};

use crate::codec::CompressionKind;
use crate::error::Result;

/// Smallest and largest datum seen in a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: Vec<u8>,
    pub max: Vec<u8>,
}

/// Statistics and placement of one column block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipNode {
    /// Rows in the block, nulls included
    pub row_count: u32,
    /// Absent for columns without a comparison or blocks of only nulls
    pub min_max: Option<MinMax>,
    pub exists_offset: u64,
    pub exists_length: u64,
    pub value_offset: u64,
    pub value_length: u64,
    pub compression: CompressionKind,
}

impl SkipNode {
    pub fn has_min_max(&self) -> bool {
        self.min_max.is_some()
    }

    pub fn min_value(&self) -> Option<&[u8]> {
        self.min_max.as_ref().map(|m| m.min.as_slice())
    }

    pub fn max_value(&self) -> Option<&[u8]> {
        self.min_max.as_ref().map(|m| m.max.as_slice())
    }
}

/// Serialize one column's skip nodes
pub fn serialize_skip_list(nodes: &[SkipNode]) -> Result<Vec<u8>> {
    Ok(bincode::serialize(nodes)?)
}

pub fn deserialize_skip_list(bytes: &[u8]) -> Result<Vec<SkipNode>> {
    Ok(bincode::deserialize(bytes)?)
}

/// Per-column section sizes of one stripe, written last in the stripe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeFooter {
    pub skip_list_lengths: Vec<u64>,
    pub exists_lengths: Vec<u64>,
    pub value_lengths: Vec<u64>,
}

impl StripeFooter {
    pub fn column_count(&self) -> usize {
        self.skip_list_lengths.len()
    }

    pub fn skip_list_length(&self) -> u64 {
        self.skip_list_lengths.iter().sum()
    }

    pub fn data_length(&self) -> u64 {
        self.exists_lengths.iter().sum::<u64>() + self.value_lengths.iter().sum::<u64>()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
