//! In-memory block store
//!
//! Volatile store with one-shot fault injection, used to exercise the
//! crash paths of the write protocol.

use parking_lot::Mutex;

use crate::error::{Result, StripeError};
use crate::format::POINTER_BLOCK;

use super::BlockStore;

/// Operation that fails the next time it is attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    DataAppend,
    FooterBlockWrite,
    PointerWrite,
}

#[derive(Default)]
struct MemoryState {
    data: Vec<u8>,
    /// Block 0 holds the pointer record
    footer_blocks: Vec<Vec<u8>>,
    armed: Vec<Fault>,
}

impl MemoryState {
    fn trip(&mut self, fault: Fault) -> Result<()> {
        if let Some(pos) = self.armed.iter().position(|&f| f == fault) {
            self.armed.remove(pos);
            return Err(StripeError::Storage(format!("injected fault: {:?}", fault)));
        }
        Ok(())
    }

    fn put_block(&mut self, block: u32, payload: &[u8]) {
        let index = block as usize;
        if index >= self.footer_blocks.len() {
            self.footer_blocks.resize(index + 1, Vec::new());
        }
        self.footer_blocks[index] = payload.to_vec();
    }
}

/// Block store kept entirely in memory
pub struct MemoryBlockStore {
    block_capacity: usize,
    state: Mutex<MemoryState>,
}

impl MemoryBlockStore {
    pub fn new(block_capacity: usize) -> Self {
        assert!(block_capacity > 0, "footer block capacity must be positive");
        Self {
            block_capacity,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Make the next `fault` operation fail
    pub fn inject_fault(&self, fault: Fault) {
        self.state.lock().armed.push(fault);
    }

    /// Copy of the whole data stream
    pub fn data(&self) -> Vec<u8> {
        self.state.lock().data.clone()
    }
}

impl BlockStore for MemoryBlockStore {
    fn append_data(&self, bytes: &[u8]) -> Result<u64> {
        let mut state = self.state.lock();
        state.trip(Fault::DataAppend)?;

        let offset = state.data.len() as u64;
        state.data.extend_from_slice(bytes);
        Ok(offset)
    }

    fn read_data(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let state = self.state.lock();
        let start = offset as usize;
        state
            .data
            .get(start..start + len)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                StripeError::Storage(format!(
                    "read of {} bytes at {} past data end {}",
                    len,
                    offset,
                    state.data.len()
                ))
            })
    }

    fn data_len(&self) -> Result<u64> {
        Ok(self.state.lock().data.len() as u64)
    }

    fn truncate_data(&self, len: u64) -> Result<()> {
        self.state.lock().data.truncate(len as usize);
        Ok(())
    }

    fn footer_block_capacity(&self) -> usize {
        self.block_capacity
    }

    fn footer_block_count(&self) -> Result<u32> {
        Ok(self.state.lock().footer_blocks.len() as u32)
    }

    fn write_footer_block(&self, block: u32, payload: &[u8]) -> Result<()> {
        if payload.len() > self.block_capacity {
            return Err(StripeError::Storage(format!(
                "{} byte payload exceeds block capacity {}",
                payload.len(),
                self.block_capacity
            )));
        }

        let mut state = self.state.lock();
        state.trip(Fault::FooterBlockWrite)?;
        state.put_block(block, payload);
        Ok(())
    }

    fn read_footer_block(&self, block: u32) -> Result<Vec<u8>> {
        self.state
            .lock()
            .footer_blocks
            .get(block as usize)
            .cloned()
            .ok_or_else(|| StripeError::Storage(format!("footer block {} not allocated", block)))
    }

    fn write_fixed_pointer(&self, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        state.trip(Fault::PointerWrite)?;
        state.put_block(POINTER_BLOCK, bytes);
        Ok(())
    }

    fn read_fixed_pointer(&self) -> Result<Option<Vec<u8>>> {
        let state = self.state.lock();
        Ok(state
            .footer_blocks
            .get(POINTER_BLOCK as usize)
            .filter(|payload| !payload.is_empty())
            .cloned())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
