//! File-backed block store
//!
//! ## Layout
//! ```text
//! {dir}/data.cstore    stripe bytes, append-only
//! {dir}/footer.cstore  fixed-size blocks:
//!                      ┌──────────────┬──────────────────────────┐
//!                      │ PayloadLen(4)│ Payload (zero padded)    │
//!                      └──────────────┴──────────────────────────┘
//!                      block 0 = pointer record, blocks 1.. = footer blobs
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Result, StripeError};
use crate::format::POINTER_BLOCK;

use super::BlockStore;

/// Per-block payload length header
const BLOCK_HEADER_SIZE: usize = 4;

/// Block store persisted as two files in one directory
pub struct FileBlockStore {
    dir: PathBuf,
    block_size: usize,
    data: Mutex<File>,
    footer: Mutex<File>,
}

impl FileBlockStore {
    const DATA_FILENAME: &'static str = "data.cstore";
    const FOOTER_FILENAME: &'static str = "footer.cstore";

    /// Open or create a store in `dir` with `block_size` byte footer blocks
    pub fn open(dir: &Path, block_size: usize) -> Result<Self> {
        if block_size <= BLOCK_HEADER_SIZE {
            return Err(StripeError::Config(format!(
                "footer block size {} leaves no room for payload",
                block_size
            )));
        }

        fs::create_dir_all(dir)?;

        let open = |name: &str| {
            OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(dir.join(name))
        };
        let data = open(Self::DATA_FILENAME)?;
        let footer = open(Self::FOOTER_FILENAME)?;

        tracing::debug!(dir = %dir.display(), block_size, "opened file block store");

        Ok(Self {
            dir: dir.to_path_buf(),
            block_size,
            data: Mutex::new(data),
            footer: Mutex::new(footer),
        })
    }

    /// Open the store described by `config`
    pub fn open_with_config(config: &Config) -> Result<Self> {
        Self::open(&config.data_dir, config.footer_block_size)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn block_offset(&self, block: u32) -> u64 {
        block as u64 * self.block_size as u64
    }
}

impl BlockStore for FileBlockStore {
    fn append_data(&self, bytes: &[u8]) -> Result<u64> {
        let mut file = self.data.lock();
        let offset = file.seek(SeekFrom::End(0))?;
        file.write_all(bytes)?;
        Ok(offset)
    }

    fn read_data(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut file = self.data.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn data_len(&self) -> Result<u64> {
        Ok(self.data.lock().metadata()?.len())
    }

    fn truncate_data(&self, len: u64) -> Result<()> {
        self.data.lock().set_len(len)?;
        Ok(())
    }

    fn footer_block_capacity(&self) -> usize {
        self.block_size - BLOCK_HEADER_SIZE
    }

    fn footer_block_count(&self) -> Result<u32> {
        let len = self.footer.lock().metadata()?.len();
        Ok((len / self.block_size as u64) as u32)
    }

    fn write_footer_block(&self, block: u32, payload: &[u8]) -> Result<()> {
        if payload.len() > self.footer_block_capacity() {
            return Err(StripeError::Storage(format!(
                "{} byte payload exceeds block capacity {}",
                payload.len(),
                self.footer_block_capacity()
            )));
        }

        let mut page = vec![0u8; self.block_size];
        page[..BLOCK_HEADER_SIZE].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        page[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + payload.len()].copy_from_slice(payload);

        // Writing past the end extends the file; skipped blocks read back empty
        let mut file = self.footer.lock();
        file.seek(SeekFrom::Start(self.block_offset(block)))?;
        file.write_all(&page)?;
        Ok(())
    }

    fn read_footer_block(&self, block: u32) -> Result<Vec<u8>> {
        if block >= self.footer_block_count()? {
            return Err(StripeError::Storage(format!(
                "footer block {} not allocated",
                block
            )));
        }

        let mut page = vec![0u8; self.block_size];
        {
            let mut file = self.footer.lock();
            file.seek(SeekFrom::Start(self.block_offset(block)))?;
            file.read_exact(&mut page)?;
        }

        let mut header = [0u8; BLOCK_HEADER_SIZE];
        header.copy_from_slice(&page[..BLOCK_HEADER_SIZE]);
        let len = u32::from_le_bytes(header) as usize;
        if len > self.footer_block_capacity() {
            return Err(StripeError::Corruption(format!(
                "footer block {} claims {} payload bytes",
                block, len
            )));
        }

        page.drain(..BLOCK_HEADER_SIZE);
        page.truncate(len);
        Ok(page)
    }

    fn write_fixed_pointer(&self, bytes: &[u8]) -> Result<()> {
        self.write_footer_block(POINTER_BLOCK, bytes)
    }

    fn read_fixed_pointer(&self) -> Result<Option<Vec<u8>>> {
        if self.footer_block_count()? == 0 {
            return Ok(None);
        }
        let payload = self.read_footer_block(POINTER_BLOCK)?;
        Ok((!payload.is_empty()).then_some(payload))
    }

    fn sync(&self) -> Result<()> {
        self.data.lock().sync_all()?;
        self.footer.lock().sync_all()?;
        Ok(())
    }
}
