//! Footer manager
//!
//! Writes and reads the table footer blob and the pointer record.

use crate::error::{Result, StripeError};
use crate::format::{
    blob_length, decode_footer_blob, encode_footer_blob, FooterPointer, TableFooterRecord,
    FIRST_FOOTER_BLOCK,
};
use crate::store::BlockStore;

/// Crash-safe persistence of the table footer
pub struct FooterManager;

impl FooterManager {
    /// Persist `record` and flip the pointer to it
    ///
    /// Returns the new pointer. On error the pointer is left untouched,
    /// unless the failure happened while writing the pointer itself.
    pub fn write(store: &dyn BlockStore, record: &TableFooterRecord) -> Result<FooterPointer> {
        let blob = encode_footer_blob(record)?;
        let capacity = store.footer_block_capacity();
        assert!(capacity > 0, "footer block capacity must be positive");

        let block_count = u32::try_from(blob.len().div_ceil(capacity)).map_err(|_| {
            StripeError::Storage(format!("{} byte footer needs too many blocks", blob.len()))
        })?;

        let current = Self::read_pointer(store)?;
        let starting_block = choose_starting_block(current, block_count);

        // Payload blocks first
        for (i, chunk) in blob.chunks(capacity).enumerate() {
            store.write_footer_block(starting_block + i as u32, chunk)?;
        }
        store.sync()?;

        // Only then the pointer flip
        let pointer = FooterPointer::new(starting_block, block_count);
        store.write_fixed_pointer(&pointer.encode())?;
        store.sync()?;

        tracing::info!(
            starting_block,
            block_count,
            blob_len = blob.len(),
            stripes = record.stripes.len(),
            previous = ?current,
            "persisted table footer"
        );

        Ok(pointer)
    }

    /// Load the footer the pointer references, or `None` if there is none
    ///
    /// An absent or unreadable pointer means no footer. A valid pointer to
    /// an unparseable footer is corruption.
    pub fn read(store: &dyn BlockStore) -> Result<Option<TableFooterRecord>> {
        let Some(pointer) = Self::read_pointer(store)? else {
            return Ok(None);
        };

        let mut blob = Vec::new();
        for block in pointer.starting_block..pointer.end_block() {
            blob.extend_from_slice(&store.read_footer_block(block)?);
        }

        let total = blob_length(&blob)?;
        if total > blob.len() {
            return Err(StripeError::Corruption(format!(
                "footer blob needs {} bytes, pointer covers {}",
                total,
                blob.len()
            )));
        }

        decode_footer_blob(&blob).map(Some)
    }

    /// Current pointer, or `None` if absent, unreadable, or out of range
    pub fn read_pointer(store: &dyn BlockStore) -> Result<Option<FooterPointer>> {
        let bytes = match store.read_fixed_pointer() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable footer pointer, treating as absent");
                return Ok(None);
            }
        };

        let Some(pointer) = FooterPointer::decode(&bytes) else {
            tracing::warn!(len = bytes.len(), "malformed footer pointer, treating as absent");
            return Ok(None);
        };

        let extent = store.footer_block_count()?;
        if pointer.end_block() > extent {
            tracing::warn!(
                ?pointer,
                extent,
                "footer pointer references unallocated blocks, treating as absent"
            );
            return Ok(None);
        }

        Ok(Some(pointer))
    }
}

/// Where a footer of `block_count` blocks goes, given the current pointer
///
/// Never overlaps the blocks `current` references: the new footer goes at
/// the first footer block when it fits strictly in front of the current
/// one, otherwise right after it.
pub fn choose_starting_block(current: Option<FooterPointer>, block_count: u32) -> u32 {
    match current {
        None => FIRST_FOOTER_BLOCK,
        Some(pointer) if FIRST_FOOTER_BLOCK + block_count <= pointer.starting_block => {
            FIRST_FOOTER_BLOCK
        }
        Some(pointer) => pointer.end_block(),
    }
}
