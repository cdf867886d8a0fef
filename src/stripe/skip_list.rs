//! Skip list builder
//!
//! One [`SkipNode`] per (column, block) of the stripe being buffered.
//! Placement fields stay zero until the stripe is flushed.

use std::cmp::Ordering;

use crate::format::{MinMax, SkipNode};
use crate::schema::{ColumnDescriptor, CompareFn};

/// Per-column, per-block statistics of an in-progress stripe
pub struct SkipListBuilder {
    columns: Vec<Vec<SkipNode>>,
}

impl SkipListBuilder {
    pub fn new(column_count: usize) -> Self {
        Self {
            columns: vec![Vec::new(); column_count],
        }
    }

    pub fn record_null(&mut self, column: usize, block: usize) {
        self.node_mut(column, block).row_count += 1;
    }

    pub fn record_value(&mut self, column: &ColumnDescriptor, block: usize, datum: &[u8]) {
        let node = self.node_mut(column.index, block);
        node.row_count += 1;
        update_min_max(node, datum, column.compare);
    }

    /// Blocks started so far (same for every column)
    pub fn block_count(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn nodes(&self, column: usize) -> &[SkipNode] {
        &self.columns[column]
    }

    pub fn nodes_mut(&mut self, column: usize) -> &mut [SkipNode] {
        &mut self.columns[column]
    }

    /// Node for `block`, started on first touch; blocks are visited in order
    fn node_mut(&mut self, column: usize, block: usize) -> &mut SkipNode {
        let nodes = &mut self.columns[column];
        assert!(
            block <= nodes.len(),
            "column {} skipped from block {} to {}",
            column,
            nodes.len(),
            block
        );
        if block == nodes.len() {
            nodes.push(SkipNode::default());
        }
        &mut nodes[block]
    }
}

/// Widen `node`'s min/max to include `datum`
///
/// Without a comparison the node keeps no min/max. Equal datums leave the
/// current extremum in place. Retained extremes are owned copies, so the
/// caller's buffer may be reused.
pub fn update_min_max(node: &mut SkipNode, datum: &[u8], compare: Option<CompareFn>) {
    let Some(compare) = compare else {
        return;
    };

    match &mut node.min_max {
        None => {
            node.min_max = Some(MinMax {
                min: datum.to_vec(),
                max: datum.to_vec(),
            });
        }
        Some(min_max) => {
            if compare(datum, &min_max.min) == Ordering::Less {
                min_max.min = datum.to_vec();
            }
            if compare(datum, &min_max.max) == Ordering::Greater {
                min_max.max = datum.to_vec();
            }
        }
    }
}
