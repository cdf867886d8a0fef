//! Stripe assembler
//!
//! Buffers one stripe and lays it out when it is flushed:
//!
//! ```text
//! [skip list col 0..N] [col 0: exists blk 0..B, values blk 0..B] ... [stripe footer]
//! ```
//!
//! Skip-list offsets are column-relative running totals, so the flush
//! order below is part of the format.

use crate::codec::{datum_length, CompressionStage};
use crate::error::{Result, StripeError};
use crate::format::{serialize_skip_list, StripeFooter, StripeMetadata};
use crate::schema::Schema;
use crate::store::BlockStore;

use super::block::{BlockAccumulator, SealedBlock};
use super::skip_list::SkipListBuilder;

/// All buffers and statistics of one in-progress stripe
pub struct StripeAssembler {
    block_row_count: u32,
    /// Rows buffered in this stripe
    row_count: u64,
    /// Active block of every column
    active: Vec<BlockAccumulator>,
    /// Sealed blocks of every column, in block order
    sealed: Vec<Vec<SealedBlock>>,
    skip_list: SkipListBuilder,
}

impl StripeAssembler {
    pub fn new(column_count: usize, block_row_count: u32) -> Self {
        assert!(block_row_count > 0, "block_row_count must be positive");

        Self {
            block_row_count,
            row_count: 0,
            active: (0..column_count)
                .map(|_| BlockAccumulator::new(block_row_count))
                .collect(),
            sealed: vec![Vec::new(); column_count],
            skip_list: SkipListBuilder::new(column_count),
        }
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Skip nodes collected so far
    pub fn skip_list(&self) -> &SkipListBuilder {
        &self.skip_list
    }

    /// Sealed blocks of `column` so far
    pub fn sealed_blocks(&self, column: usize) -> &[SealedBlock] {
        &self.sealed[column]
    }

    /// Buffer one row whose datums were already validated against `schema`
    ///
    /// Seals every column's block when the row fills it.
    pub fn write_row(
        &mut self,
        schema: &Schema,
        row: &[Option<&[u8]>],
        compression: &CompressionStage,
    ) -> Result<()> {
        assert_eq!(row.len(), self.active.len(), "row width does not match stripe");

        let block_index = (self.row_count / self.block_row_count as u64) as usize;
        let block_row_index = (self.row_count % self.block_row_count as u64) as u32;

        for (column, datum) in schema.columns().iter().zip(row) {
            let block = &mut self.active[column.index];
            match datum {
                None => {
                    block.record_null();
                    self.skip_list.record_null(column.index, block_index);
                }
                Some(datum) => {
                    // Bytes past a variable-length header are never stored
                    let datum = &datum[..datum_length(datum, column)?];
                    block.record_value(datum, column)?;
                    self.skip_list.record_value(column, block_index, datum);
                }
            }
        }

        if block_row_index == self.block_row_count - 1 {
            self.seal_active(compression);
        }

        self.row_count += 1;
        Ok(())
    }

    /// Seal and compress the active block of every column
    fn seal_active(&mut self, compression: &CompressionStage) {
        for (column, block) in self.active.iter_mut().enumerate() {
            let raw_len = block.value_len();
            let sealed = block.seal(compression);
            tracing::debug!(
                column,
                block = self.sealed[column].len(),
                rows = sealed.row_count,
                raw_len,
                stored_len = sealed.values.len(),
                compression = ?sealed.compression,
                "sealed block"
            );
            self.sealed[column].push(sealed);
        }
    }

    /// Lay the stripe out and append it to `store`
    ///
    /// `file_offset` is the data cursor the stripe must start at. Consumes
    /// the assembler, releasing every buffer of the stripe.
    pub fn flush(
        mut self,
        compression: &CompressionStage,
        store: &dyn BlockStore,
        file_offset: u64,
    ) -> Result<StripeMetadata> {
        assert!(!self.is_empty(), "flushing a stripe with no rows");

        // Step 1: seal a partially filled last block
        if self.active.first().is_some_and(|block| !block.is_empty()) {
            self.seal_active(compression);
        }

        // Step 2: column-relative offsets and per-block compression tags
        for (column, blocks) in self.sealed.iter().enumerate() {
            let nodes = self.skip_list.nodes_mut(column);
            assert_eq!(nodes.len(), blocks.len(), "skip nodes out of step with blocks");

            let mut exists_offset = 0u64;
            let mut value_offset = 0u64;
            for (node, block) in nodes.iter_mut().zip(blocks) {
                node.exists_offset = exists_offset;
                node.exists_length = block.exists.len() as u64;
                node.value_offset = value_offset;
                node.value_length = block.values.len() as u64;
                node.compression = block.compression;

                exists_offset += node.exists_length;
                value_offset += node.value_length;
            }
        }

        // Step 3: one skip-list buffer per column
        let skip_lists = (0..self.sealed.len())
            .map(|column| serialize_skip_list(self.skip_list.nodes(column)))
            .collect::<Result<Vec<_>>>()?;

        // Step 4: stripe footer with per-column section sizes
        let footer = StripeFooter {
            skip_list_lengths: skip_lists.iter().map(|b| b.len() as u64).collect(),
            exists_lengths: self
                .sealed
                .iter()
                .map(|blocks| blocks.iter().map(|b| b.exists.len() as u64).sum())
                .collect(),
            value_lengths: self
                .sealed
                .iter()
                .map(|blocks| blocks.iter().map(|b| b.values.len() as u64).sum())
                .collect(),
        };
        let footer_bytes = footer.encode()?;

        // Step 5: skip lists, then per column all exists then all values, then footer
        let mut cursor = file_offset;
        for buffer in &skip_lists {
            emit(store, buffer, &mut cursor)?;
        }
        for blocks in &self.sealed {
            for block in blocks {
                emit(store, &block.exists, &mut cursor)?;
            }
            for block in blocks {
                emit(store, &block.values, &mut cursor)?;
            }
        }
        emit(store, &footer_bytes, &mut cursor)?;

        // Step 6: placement record
        let metadata = StripeMetadata {
            file_offset,
            skip_list_length: footer.skip_list_length(),
            data_length: footer.data_length(),
            footer_length: footer_bytes.len() as u64,
        };
        debug_assert_eq!(metadata.end_offset(), cursor);

        tracing::debug!(
            file_offset,
            rows = self.row_count,
            blocks = self.skip_list.block_count(),
            skip_list_length = metadata.skip_list_length,
            data_length = metadata.data_length,
            footer_length = metadata.footer_length,
            "flushed stripe"
        );

        Ok(metadata)
    }
}

/// Append `bytes` at the expected data cursor
fn emit(store: &dyn BlockStore, bytes: &[u8], cursor: &mut u64) -> Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }

    let offset = store.append_data(bytes)?;
    if offset != *cursor {
        return Err(StripeError::Storage(format!(
            "data stream appended at {}, expected {}",
            offset, cursor
        )));
    }

    *cursor += bytes.len() as u64;
    Ok(())
}
