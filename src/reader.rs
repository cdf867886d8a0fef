//! Reader Module
//!
//! Read path mirroring the writer: locate stripes through the footer, read
//! skip lists without touching data, and decode blocks back into rows.

use std::sync::Arc;

use crate::codec::compression::decompress;
use crate::codec::{deserialize_bool_array, deserialize_datums};
use crate::error::{Result, StripeError};
use crate::footer::FooterManager;
use crate::format::{deserialize_skip_list, SkipNode, StripeFooter, StripeMetadata, TableFooterRecord};
use crate::schema::Schema;
use crate::store::BlockStore;

/// One decoded row: a datum per column, `None` for NULL
pub type Row = Vec<Option<Vec<u8>>>;

/// Reader over the stripes committed in a table's footer
pub struct TableReader {
    store: Arc<dyn BlockStore>,
    schema: Schema,
    footer: TableFooterRecord,
}

impl TableReader {
    /// Open the table; a store without a footer reads as empty
    pub fn open(store: Arc<dyn BlockStore>, schema: Schema) -> Result<Self> {
        let footer = FooterManager::read(store.as_ref())?.unwrap_or_else(|| TableFooterRecord::new(0));
        Ok(Self {
            store,
            schema,
            footer,
        })
    }

    pub fn stripes(&self) -> &[StripeMetadata] {
        &self.footer.stripes
    }

    pub fn block_row_count(&self) -> u32 {
        self.footer.block_row_count
    }

    pub fn footer(&self) -> &TableFooterRecord {
        &self.footer
    }

    /// Read the stripe footer, found at the stripe's tail
    pub fn read_stripe_footer(&self, stripe: usize) -> Result<StripeFooter> {
        let meta = self.stripe(stripe)?;
        let bytes = self.store.read_data(
            meta.file_offset + meta.skip_list_length + meta.data_length,
            meta.footer_length as usize,
        )?;
        let footer = StripeFooter::decode(&bytes)
            .map_err(|e| StripeError::Corruption(format!("stripe {} footer: {}", stripe, e)))?;

        if footer.column_count() != self.schema.len() {
            return Err(StripeError::Corruption(format!(
                "stripe {} has {} columns, schema has {}",
                stripe,
                footer.column_count(),
                self.schema.len()
            )));
        }
        Ok(footer)
    }

    /// Skip nodes of one column, read from the skip-list section only
    pub fn read_skip_list(&self, stripe: usize, column: usize) -> Result<Vec<SkipNode>> {
        let meta = self.stripe(stripe)?;
        let footer = self.read_stripe_footer(stripe)?;

        let offset: u64 = footer.skip_list_lengths[..column].iter().sum();
        let bytes = self.store.read_data(
            meta.file_offset + offset,
            footer.skip_list_lengths[column] as usize,
        )?;

        deserialize_skip_list(&bytes)
            .map_err(|e| StripeError::Corruption(format!("stripe {} skip list {}: {}", stripe, column, e)))
    }

    /// Decode every row of one stripe
    pub fn read_stripe_rows(&self, stripe: usize) -> Result<Vec<Row>> {
        let meta = self.stripe(stripe)?;
        let footer = self.read_stripe_footer(stripe)?;
        let data = self.store.read_data(meta.file_offset, meta.total_length() as usize)?;

        let mut columns: Vec<Vec<Option<Vec<u8>>>> = Vec::with_capacity(self.schema.len());
        let mut skip_list_start = 0usize;
        let mut column_start = meta.skip_list_length as usize;

        for column in self.schema.columns() {
            let skip_list_len = footer.skip_list_lengths[column.index] as usize;
            let nodes = deserialize_skip_list(slice(&data, skip_list_start, skip_list_len)?)?;
            skip_list_start += skip_list_len;

            let exists_start = column_start;
            let values_start = exists_start + footer.exists_lengths[column.index] as usize;
            column_start = values_start + footer.value_lengths[column.index] as usize;

            let mut datums = Vec::new();
            for node in &nodes {
                let exists_bytes = slice(
                    &data,
                    exists_start + node.exists_offset as usize,
                    node.exists_length as usize,
                )?;
                let exists = deserialize_bool_array(exists_bytes, node.row_count as usize)?;

                let stored = slice(
                    &data,
                    values_start + node.value_offset as usize,
                    node.value_length as usize,
                )?;
                let values = decompress(node.compression, stored)?;

                datums.extend(deserialize_datums(&values, &exists, column)?);
            }
            columns.push(datums);
        }

        transpose(columns)
    }

    /// Decode every committed row, in write order
    pub fn read_all_rows(&self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for stripe in 0..self.stripes().len() {
            rows.extend(self.read_stripe_rows(stripe)?);
        }
        Ok(rows)
    }

    fn stripe(&self, stripe: usize) -> Result<&StripeMetadata> {
        self.footer.stripes.get(stripe).ok_or_else(|| {
            StripeError::Storage(format!(
                "stripe {} out of range ({} stripes)",
                stripe,
                self.footer.stripes.len()
            ))
        })
    }
}

fn slice(data: &[u8], start: usize, len: usize) -> Result<&[u8]> {
    data.get(start..start + len).ok_or_else(|| {
        StripeError::Corruption(format!(
            "section {}..{} outside stripe of {} bytes",
            start,
            start + len,
            data.len()
        ))
    })
}

/// Column-major datums to row-major rows
fn transpose(columns: Vec<Vec<Option<Vec<u8>>>>) -> Result<Vec<Row>> {
    let row_count = columns.first().map(Vec::len).unwrap_or(0);
    if columns.iter().any(|c| c.len() != row_count) {
        return Err(StripeError::Corruption("columns disagree on row count".into()));
    }

    let mut iters: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
    Ok((0..row_count)
        .map(|_| iters.iter_mut().filter_map(Iterator::next).collect())
        .collect())
}
