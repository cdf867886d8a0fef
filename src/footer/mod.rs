//! Footer Module
//!
//! Persists the table footer with an append-only relocation protocol.
//!
//! ## Protocol
//! 1. Serialize the footer blob
//! 2. Pick blocks that do not overlap the footer the pointer references
//! 3. Write every blob block, then sync
//! 4. Overwrite the pointer record, then sync
//!
//! A crash before step 4 leaves the pointer on the old, intact footer; a
//! crash after it leaves the pointer on the new, fully written footer.

mod manager;

pub use manager::{choose_starting_block, FooterManager};
