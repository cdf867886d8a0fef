//! Footer pointer record
//!
//! The only mutable record in the format. Everything it points at is
//! written before it is overwritten.

use super::FIRST_FOOTER_BLOCK;

/// Location of the current valid footer blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FooterPointer {
    pub starting_block: u32,
    pub block_count: u32,
}

impl FooterPointer {
    /// Encoded size: StartingBlock (4) + BlockCount (4)
    pub const SIZE: usize = 8;

    pub fn new(starting_block: u32, block_count: u32) -> Self {
        Self {
            starting_block,
            block_count,
        }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.starting_block.to_le_bytes());
        buf[4..8].copy_from_slice(&self.block_count.to_le_bytes());
        buf
    }

    /// Decode a pointer, or `None` if the bytes cannot be a valid pointer
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }

        let starting_block = u32::from_le_bytes(bytes[0..4].try_into().ok()?);
        let block_count = u32::from_le_bytes(bytes[4..8].try_into().ok()?);
        let pointer = Self::new(starting_block, block_count);

        pointer.is_structurally_valid().then_some(pointer)
    }

    /// First block after the footer this pointer references
    pub fn end_block(&self) -> u32 {
        self.starting_block.saturating_add(self.block_count)
    }

    fn is_structurally_valid(&self) -> bool {
        self.starting_block >= FIRST_FOOTER_BLOCK && self.block_count > 0
    }
}
