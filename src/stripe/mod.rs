//! Stripe Module
//!
//! In-memory buffering of one stripe until it is flushed.
//!
//! ## Responsibilities
//! - Stage each column's active block (exists flags + serialized values)
//! - Track per-block statistics (row count, min/max)
//! - Seal and compress blocks as they fill
//! - Lay a finished stripe out and emit it to the block store
//!
//! All state of an in-progress stripe lives in one [`StripeAssembler`];
//! flushing consumes it, so the whole stripe's memory is released at once.

mod assembler;
mod block;
mod skip_list;

pub use assembler::StripeAssembler;
pub use block::{BlockAccumulator, SealedBlock};
pub use skip_list::{update_min_max, SkipListBuilder};
