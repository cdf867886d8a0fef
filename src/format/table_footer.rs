//! Table footer and its blob encoding
//!
//! The table footer lists every committed stripe. It is serialized into a
//! self-describing blob that can be split across footer blocks and
//! reassembled from its length prefix alone.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StripeError};

use super::{BLOB_LENGTH_SIZE, MAGIC, POSTSCRIPT_SIZE_LENGTH, POSTSCRIPT_SIZE_MAX, VERSION};

/// Everything a reader needs to locate one stripe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeMetadata {
    pub file_offset: u64,
    pub skip_list_length: u64,
    pub data_length: u64,
    pub footer_length: u64,
}

impl StripeMetadata {
    pub fn total_length(&self) -> u64 {
        self.skip_list_length + self.data_length + self.footer_length
    }

    /// Data offset right after this stripe
    pub fn end_offset(&self) -> u64 {
        self.file_offset + self.total_length()
    }
}

/// Table-level index of stripes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFooterRecord {
    pub block_row_count: u32,
    pub stripes: Vec<StripeMetadata>,
}

impl TableFooterRecord {
    pub fn new(block_row_count: u32) -> Self {
        Self {
            block_row_count,
            stripes: Vec::new(),
        }
    }

    pub fn append_stripe(&mut self, stripe: StripeMetadata) {
        self.stripes.push(stripe);
    }

    /// Data offset where the next stripe starts
    pub fn end_offset(&self) -> u64 {
        self.stripes.last().map(StripeMetadata::end_offset).unwrap_or(0)
    }
}

/// Trailer describing the serialized footer in front of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostScript {
    pub footer_length: u64,
    pub footer_crc: u32,
    pub version: u16,
    pub magic: [u8; 4],
}

/// Encode `[TotalLen: u32][footer][postscript][postscript len: u8]`
pub fn encode_footer_blob(record: &TableFooterRecord) -> Result<Vec<u8>> {
    let footer = bincode::serialize(record)?;
    let postscript = bincode::serialize(&PostScript {
        footer_length: footer.len() as u64,
        footer_crc: crc32fast::hash(&footer),
        version: VERSION,
        magic: *MAGIC,
    })?;
    assert!(postscript.len() < POSTSCRIPT_SIZE_MAX);

    let total = BLOB_LENGTH_SIZE + footer.len() + postscript.len() + POSTSCRIPT_SIZE_LENGTH;
    let total_len = u32::try_from(total).map_err(|_| {
        StripeError::Serialization(format!("footer blob of {} bytes is too large", total))
    })?;

    let mut blob = Vec::with_capacity(total);
    blob.extend_from_slice(&total_len.to_le_bytes());
    blob.extend_from_slice(&footer);
    blob.extend_from_slice(&postscript);
    blob.push(postscript.len() as u8);

    Ok(blob)
}

/// Read the total blob length from the first bytes of a blob
pub fn blob_length(prefix: &[u8]) -> Result<usize> {
    let bytes: [u8; BLOB_LENGTH_SIZE] = prefix
        .get(..BLOB_LENGTH_SIZE)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| StripeError::Corruption("footer blob shorter than its length prefix".into()))?;
    Ok(u32::from_le_bytes(bytes) as usize)
}

/// Decode a blob produced by [`encode_footer_blob`]; trailing bytes are ignored
pub fn decode_footer_blob(blob: &[u8]) -> Result<TableFooterRecord> {
    let total = blob_length(blob)?;
    if total < BLOB_LENGTH_SIZE + POSTSCRIPT_SIZE_LENGTH || total > blob.len() {
        return Err(StripeError::Corruption(format!(
            "footer blob announces {} bytes, {} available",
            total,
            blob.len()
        )));
    }
    let blob = &blob[..total];

    let postscript_len = blob[total - 1] as usize;
    let postscript_end = total - POSTSCRIPT_SIZE_LENGTH;
    let postscript_start = postscript_end
        .checked_sub(postscript_len)
        .filter(|&start| start >= BLOB_LENGTH_SIZE)
        .ok_or_else(|| StripeError::Corruption("postscript overruns footer blob".into()))?;

    let postscript: PostScript = bincode::deserialize(&blob[postscript_start..postscript_end])
        .map_err(|e| StripeError::Corruption(format!("unreadable postscript: {}", e)))?;

    if &postscript.magic != MAGIC {
        return Err(StripeError::Corruption(format!(
            "invalid footer magic: {:?}",
            postscript.magic
        )));
    }
    if postscript.version != VERSION {
        return Err(StripeError::Corruption(format!(
            "unsupported footer version: {}",
            postscript.version
        )));
    }

    let footer_end = BLOB_LENGTH_SIZE as u64 + postscript.footer_length;
    if footer_end != postscript_start as u64 {
        return Err(StripeError::Corruption(format!(
            "footer length {} does not match postscript position {}",
            postscript.footer_length, postscript_start
        )));
    }

    let footer = &blob[BLOB_LENGTH_SIZE..postscript_start];
    if crc32fast::hash(footer) != postscript.footer_crc {
        return Err(StripeError::Corruption("footer checksum mismatch".into()));
    }

    bincode::deserialize(footer)
        .map_err(|e| StripeError::Corruption(format!("unreadable table footer: {}", e)))
}
