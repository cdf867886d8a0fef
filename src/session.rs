//! Session Module
//!
//! A write session ingests rows in call order, cuts them into stripes and
//! persists the table footer once, at the end.
//!
//! ## Lifecycle
//! ```text
//! begin ──► Ingesting ──finish──► Finalizing ──► FooterPersisted
//!               │
//!               └─ store failure ──► Poisoned (footer never written)
//! ```
//!
//! Stripes flushed before `finish` are durable but invisible: the footer is
//! the only index of stripes, and it is written after all stripe bytes.

use std::sync::Arc;

use crate::codec::{datum_length, CompressionStage};
use crate::config::Config;
use crate::error::{Result, StripeError};
use crate::footer::FooterManager;
use crate::format::{FooterPointer, StripeMetadata, TableFooterRecord};
use crate::schema::{Schema, Value};
use crate::store::BlockStore;
use crate::stripe::StripeAssembler;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ingesting,
    Finalizing,
    FooterPersisted,
    /// A store failure ended the session; nothing more is written
    Poisoned,
}

/// Outcome of a finished session
#[derive(Debug, Clone)]
pub struct WriteSummary {
    /// Rows ingested by this session
    pub rows_written: u64,
    /// Stripes flushed by this session
    pub stripes_written: usize,
    /// Stripes listed in the persisted footer
    pub total_stripes: usize,
    pub footer_pointer: FooterPointer,
}

/// Single-use, single-writer ingestion of rows into a table
pub struct WriteSession {
    store: Arc<dyn BlockStore>,
    schema: Schema,
    compression: CompressionStage,
    stripe_max_row_count: u64,
    /// Table footer, grown by one entry per flushed stripe
    footer: TableFooterRecord,
    /// Data offset the next stripe starts at
    file_offset: u64,
    /// Stripe being buffered; created on its first row
    stripe: Option<StripeAssembler>,
    state: SessionState,
    rows_written: u64,
    stripes_written: usize,
}

impl WriteSession {
    /// Start writing to the table held by `store`
    ///
    /// If the store already has a footer, new stripes are appended after the
    /// last committed one and the footer's block row count is kept. Data
    /// bytes past the last committed stripe (left by an abandoned session)
    /// are discarded. A store whose pointer record exists but references no
    /// readable footer is never truncated; `begin` fails with corruption
    /// when it still holds data.
    pub fn begin(store: Arc<dyn BlockStore>, schema: Schema, config: &Config) -> Result<Self> {
        config.validate()?;
        if schema.is_empty() {
            return Err(StripeError::Config("schema has no columns".to_string()));
        }

        let footer = FooterManager::read(store.as_ref())?;
        if let Some(existing) = &footer {
            if existing.block_row_count != config.block_row_count {
                tracing::warn!(
                    stored = existing.block_row_count,
                    configured = config.block_row_count,
                    "keeping block row count of existing table"
                );
            }
        }

        let data_len = store.data_len()?;
        let file_offset = footer.as_ref().map(TableFooterRecord::end_offset).unwrap_or(0);
        if data_len < file_offset {
            return Err(StripeError::Corruption(format!(
                "data stream is {} bytes but committed stripes end at {}",
                data_len, file_offset
            )));
        }
        if data_len > file_offset {
            // Without a readable footer, data next to a pointer record may be committed
            if footer.is_none() && !matches!(store.read_fixed_pointer(), Ok(None)) {
                return Err(StripeError::Corruption(format!(
                    "footer pointer is unusable but the data stream holds {} bytes",
                    data_len
                )));
            }
            tracing::warn!(
                committed = file_offset,
                data_len,
                "discarding uncommitted stripe bytes"
            );
            store.truncate_data(file_offset)?;
        }

        let footer = footer.unwrap_or_else(|| TableFooterRecord::new(config.block_row_count));

        tracing::debug!(
            columns = schema.len(),
            existing_stripes = footer.stripes.len(),
            file_offset,
            block_row_count = footer.block_row_count,
            stripe_max_row_count = config.stripe_max_row_count,
            "began write session"
        );

        Ok(Self {
            store,
            schema,
            compression: CompressionStage::new(config.compression),
            stripe_max_row_count: config.stripe_max_row_count,
            footer,
            file_offset,
            stripe: None,
            state: SessionState::Ingesting,
            rows_written: 0,
            stripes_written: 0,
        })
    }

    /// Replace the configured codec (e.g. with a custom [`crate::codec::Codec`])
    pub fn with_compression(mut self, compression: CompressionStage) -> Self {
        self.compression = compression;
        self
    }

    /// Ingest one row; `None` entries are NULL
    ///
    /// The whole row is validated before any buffer is touched, so a
    /// rejected row leaves the session unchanged.
    pub fn write_row(&mut self, row: &[Option<&[u8]>]) -> Result<()> {
        self.ensure_ingesting()?;

        if row.len() != self.schema.len() {
            return Err(StripeError::SchemaMismatch {
                expected: self.schema.len(),
                actual: row.len(),
            });
        }
        for (column, datum) in self.schema.columns().iter().zip(row) {
            if let Some(datum) = datum {
                datum_length(datum, column)?;
            }
        }

        let block_row_count = self.footer.block_row_count;
        let column_count = self.schema.len();
        let stripe = self
            .stripe
            .get_or_insert_with(|| StripeAssembler::new(column_count, block_row_count));

        if let Err(e) = stripe.write_row(&self.schema, row, &self.compression) {
            self.state = SessionState::Poisoned;
            return Err(e);
        }
        self.rows_written += 1;

        if stripe.row_count() >= self.stripe_max_row_count {
            self.flush_stripe()?;
        }
        Ok(())
    }

    /// Ingest one row of typed values
    pub fn write_values(&mut self, values: &[Value]) -> Result<()> {
        self.ensure_ingesting()?;
        if values.len() != self.schema.len() {
            return Err(StripeError::SchemaMismatch {
                expected: self.schema.len(),
                actual: values.len(),
            });
        }

        let encoded = self
            .schema
            .columns()
            .iter()
            .zip(values)
            .map(|(column, value)| match column.column_type {
                Some(ty) => value.encode(ty),
                None if value.is_null() => Ok(None),
                None => Err(StripeError::InvalidValue(format!(
                    "column {} has no logical type; write raw datums instead",
                    column.index
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        let row: Vec<Option<&[u8]>> = encoded.iter().map(Option::as_deref).collect();
        self.write_row(&row)
    }

    /// Flush the buffered stripe now; no-op when nothing is buffered
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_ingesting()?;
        self.flush_stripe()
    }

    /// Flush any partial stripe and persist the footer
    pub fn finish(mut self) -> Result<WriteSummary> {
        self.ensure_ingesting()?;
        self.state = SessionState::Finalizing;

        self.flush_stripe()?;

        let footer_pointer = match FooterManager::write(self.store.as_ref(), &self.footer) {
            Ok(pointer) => pointer,
            Err(e) => {
                self.state = SessionState::Poisoned;
                return Err(e);
            }
        };
        self.state = SessionState::FooterPersisted;

        Ok(WriteSummary {
            rows_written: self.rows_written,
            stripes_written: self.stripes_written,
            total_stripes: self.footer.stripes.len(),
            footer_pointer,
        })
    }

    fn flush_stripe(&mut self) -> Result<()> {
        let Some(stripe) = self.stripe.take() else {
            return Ok(());
        };
        if stripe.is_empty() {
            return Ok(());
        }

        match stripe.flush(&self.compression, self.store.as_ref(), self.file_offset) {
            Ok(metadata) => {
                self.record_stripe(metadata);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, file_offset = self.file_offset, "stripe flush failed");
                self.state = SessionState::Poisoned;
                Err(e)
            }
        }
    }

    fn record_stripe(&mut self, metadata: StripeMetadata) {
        self.file_offset = metadata.end_offset();
        self.footer.append_stripe(metadata);
        self.stripes_written += 1;
    }

    fn ensure_ingesting(&self) -> Result<()> {
        match self.state {
            SessionState::Ingesting => Ok(()),
            SessionState::Poisoned => Err(StripeError::SessionPoisoned),
            state => panic!("write session used in state {:?}", state),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// In-memory footer: committed stripes plus those flushed this session
    pub fn footer(&self) -> &TableFooterRecord {
        &self.footer
    }

    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Rows buffered in the current, unflushed stripe
    pub fn buffered_rows(&self) -> u64 {
        self.stripe.as_ref().map(StripeAssembler::row_count).unwrap_or(0)
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl Drop for WriteSession {
    fn drop(&mut self) {
        let unpublished = self.buffered_rows() > 0 || self.stripes_written > 0;
        if self.state == SessionState::Ingesting && unpublished {
            tracing::warn!(
                buffered_rows = self.buffered_rows(),
                unpublished_stripes = self.stripes_written,
                "write session dropped before finish; its rows are not visible"
            );
        }
    }
}
