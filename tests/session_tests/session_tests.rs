//! Tests for WriteSession
//!
//! These tests verify:
//! - Stripe boundaries and block statistics of ingested rows
//! - Rejected rows leave the session usable
//! - Store failures poison the session and never publish a footer
//! - Sessions resume after the last committed stripe

use std::sync::Arc;

use stripestore::footer::FooterManager;
use stripestore::format::{FooterPointer, SkipNode};
use stripestore::schema::varlena;
use stripestore::store::{BlockStore, Fault, MemoryBlockStore};
use stripestore::{
    ColumnType, Config, Schema, SessionState, StripeError, TableReader, Value, WriteSession,
};

// =============================================================================
// Helpers
// =============================================================================

type IntRow = [Option<i32>; 2];

fn config(block_rows: u32, stripe_rows: u64) -> Config {
    Config::builder()
        .block_row_count(block_rows)
        .stripe_max_row_count(stripe_rows)
        .build()
}

fn int_schema() -> Schema {
    Schema::from_types(&[ColumnType::Int32, ColumnType::Int32])
}

fn begin(store: &Arc<MemoryBlockStore>, config: &Config) -> WriteSession {
    WriteSession::begin(store.clone(), int_schema(), config).unwrap()
}

fn ints(row: IntRow) -> Vec<Value> {
    row.iter().map(|v| v.map_or(Value::Null, Value::Int32)).collect()
}

fn write_ints(session: &mut WriteSession, rows: &[IntRow]) {
    for row in rows {
        session.write_values(&ints(*row)).unwrap();
    }
}

fn as_i32(datum: &[u8]) -> i32 {
    i32::from_le_bytes(datum[..4].try_into().unwrap())
}

/// Every committed row, in write order
fn read_ints(store: &Arc<MemoryBlockStore>) -> Vec<IntRow> {
    let reader = TableReader::open(store.clone(), int_schema()).unwrap();
    reader
        .read_all_rows()
        .unwrap()
        .into_iter()
        .map(|row| [row[0].as_deref().map(as_i32), row[1].as_deref().map(as_i32)])
        .collect()
}

fn min_max(node: &SkipNode) -> Option<(i32, i32)> {
    Some((as_i32(node.min_value()?), as_i32(node.max_value()?)))
}

// =============================================================================
// Ingestion Tests
// =============================================================================

#[test]
fn test_two_block_stripe_statistics() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let mut session = begin(&store, &config(2, 4));

    let rows = [
        [Some(1), None],
        [Some(2), Some(20)],
        [None, Some(30)],
        [Some(4), Some(40)],
    ];
    write_ints(&mut session, &rows);

    // The fourth row completes the stripe
    assert_eq!(session.buffered_rows(), 0);
    assert_eq!(session.footer().stripes.len(), 1);

    let summary = session.finish().unwrap();
    assert_eq!(summary.rows_written, 4);
    assert_eq!(summary.stripes_written, 1);
    assert_eq!(summary.total_stripes, 1);

    let reader = TableReader::open(store.clone(), int_schema()).unwrap();
    let col0 = reader.read_skip_list(0, 0).unwrap();
    let col1 = reader.read_skip_list(0, 1).unwrap();

    assert_eq!(col0.len(), 2);
    assert_eq!(col1.len(), 2);
    assert!(col0.iter().chain(&col1).all(|node| node.row_count == 2));

    assert_eq!(min_max(&col0[0]), Some((1, 2)));
    assert_eq!(min_max(&col0[1]), Some((4, 4)));
    assert_eq!(min_max(&col1[0]), Some((20, 20)));
    assert_eq!(min_max(&col1[1]), Some((30, 40)));

    assert_eq!(read_ints(&store), rows.to_vec());
}

#[test]
fn test_stripe_boundaries() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let mut session = begin(&store, &config(3, 4));

    let rows: Vec<IntRow> = (0..10).map(|i| [Some(i), Some(-i)]).collect();
    write_ints(&mut session, &rows);

    assert_eq!(session.footer().stripes.len(), 2);
    assert_eq!(session.buffered_rows(), 2);

    let summary = session.finish().unwrap();
    assert_eq!(summary.total_stripes, 3);

    let reader = TableReader::open(store.clone(), int_schema()).unwrap();
    let sizes: Vec<usize> = (0..3)
        .map(|s| reader.read_stripe_rows(s).unwrap().len())
        .collect();
    assert_eq!(sizes, vec![4, 4, 2]);

    let blocks: Vec<u32> = reader
        .read_skip_list(0, 0)
        .unwrap()
        .iter()
        .map(|n| n.row_count)
        .collect();
    assert_eq!(blocks, vec![3, 1]);
    assert_eq!(reader.read_skip_list(2, 1).unwrap().len(), 1);

    // Stripes are contiguous in the data stream
    let stripes = reader.stripes();
    assert_eq!(stripes[0].file_offset, 0);
    assert_eq!(stripes[1].file_offset, stripes[0].end_offset());
    assert_eq!(stripes[2].file_offset, stripes[1].end_offset());
    assert_eq!(store.data_len().unwrap(), stripes[2].end_offset());

    assert_eq!(read_ints(&store), rows);
}

#[test]
fn test_finish_without_rows() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let session = begin(&store, &config(5, 10));

    let summary = session.finish().unwrap();

    assert_eq!(summary.rows_written, 0);
    assert_eq!(summary.total_stripes, 0);
    assert_eq!(summary.footer_pointer, FooterPointer::new(1, 1));
    assert_eq!(store.data_len().unwrap(), 0);

    let reader = TableReader::open(store.clone(), int_schema()).unwrap();
    assert!(reader.stripes().is_empty());
    assert_eq!(reader.block_row_count(), 5);
}

#[test]
fn test_explicit_flush() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let mut session = begin(&store, &config(2, 100));

    session.flush().unwrap();
    assert!(session.footer().stripes.is_empty());

    write_ints(&mut session, &[[Some(1), Some(2)], [Some(3), None], [None, None]]);
    session.flush().unwrap();
    let after_flush = store.data_len().unwrap();

    assert_eq!(session.buffered_rows(), 0);
    assert_eq!(session.footer().stripes.len(), 1);
    assert_eq!(session.file_offset(), after_flush);

    // Nothing buffered, nothing written
    session.flush().unwrap();
    assert_eq!(store.data_len().unwrap(), after_flush);

    // Flushed stripes stay invisible until the footer is written
    assert!(read_ints(&store).is_empty());

    write_ints(&mut session, &[[Some(5), Some(6)]]);
    let summary = session.finish().unwrap();

    assert_eq!(summary.total_stripes, 2);
    assert_eq!(read_ints(&store).len(), 4);
}

#[test]
fn test_all_null_column_has_no_statistics() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let mut session = begin(&store, &config(4, 100));

    write_ints(&mut session, &[[Some(1), None], [Some(2), None], [Some(3), None]]);
    session.finish().unwrap();

    let reader = TableReader::open(store.clone(), int_schema()).unwrap();
    let nodes = reader.read_skip_list(0, 1).unwrap();

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].row_count, 3);
    assert!(!nodes[0].has_min_max());
    assert_eq!(nodes[0].value_length, 0);
}

// =============================================================================
// Rejected Row Tests
// =============================================================================

#[test]
fn test_wrong_width_row_rejected() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let mut session = begin(&store, &config(2, 100));

    let one = 1i32.to_le_bytes();
    let err = session.write_row(&[Some(&one[..])]).unwrap_err();
    assert!(matches!(
        err,
        StripeError::SchemaMismatch {
            expected: 2,
            actual: 1
        }
    ));

    let err = session.write_values(&vec![Value::Int32(1); 3]).unwrap_err();
    assert!(matches!(err, StripeError::SchemaMismatch { .. }));

    assert_eq!(session.state(), SessionState::Ingesting);
    write_ints(&mut session, &[[Some(9), Some(9)]]);
    assert_eq!(session.finish().unwrap().rows_written, 1);
}

#[test]
fn test_invalid_datum_leaves_session_unchanged() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let mut session = begin(&store, &config(2, 100));
    write_ints(&mut session, &[[Some(1), Some(10)]]);

    // Valid first column, malformed second: nothing of the row is kept
    let one = 1i32.to_le_bytes();
    let err = session.write_row(&[Some(&one[..]), Some(&[1, 2, 3][..])]).unwrap_err();
    assert!(matches!(err, StripeError::InvalidValue(_)));

    let err = session
        .write_values(&[Value::Text("x".into()), Value::Null])
        .unwrap_err();
    assert!(matches!(err, StripeError::InvalidValue(_)));

    assert_eq!(session.buffered_rows(), 1);
    assert_eq!(session.rows_written(), 1);

    write_ints(&mut session, &[[Some(2), Some(20)]]);
    session.finish().unwrap();

    assert_eq!(
        read_ints(&store),
        vec![[Some(1), Some(10)], [Some(2), Some(20)]]
    );
}

#[test]
fn test_bytes_past_varlena_header_excluded_from_statistics() {
    let schema = Schema::from_types(&[ColumnType::Text]);
    let store = Arc::new(MemoryBlockStore::new(64));
    let mut session = WriteSession::begin(store.clone(), schema.clone(), &config(4, 100)).unwrap();

    // Header announces "ab"; the trailing "zz" is not part of the datum
    let mut datum = varlena(b"ab");
    datum.extend_from_slice(b"zz");
    session.write_row(&[Some(&datum[..])]).unwrap();
    session.write_values(&[Value::Text("aa".into())]).unwrap();
    session.finish().unwrap();

    let reader = TableReader::open(store.clone(), schema).unwrap();
    let rows = reader.read_all_rows().unwrap();
    let node = &reader.read_skip_list(0, 0).unwrap()[0];

    assert_eq!(rows[0][0], Some(varlena(b"ab")));
    assert_eq!(node.min_value(), Some(&varlena(b"aa")[..]));
    assert_eq!(node.max_value(), Some(&varlena(b"ab")[..]));
}

#[test]
fn test_invalid_configuration() {
    let store = Arc::new(MemoryBlockStore::new(64));

    let empty = WriteSession::begin(store.clone(), Schema::new(Vec::new()), &config(2, 4));
    assert!(matches!(empty, Err(StripeError::Config(_))));

    let zero_blocks = WriteSession::begin(store.clone(), int_schema(), &config(0, 4));
    assert!(matches!(zero_blocks, Err(StripeError::Config(_))));
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_append_failure_poisons_session() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let mut session = begin(&store, &config(2, 2));
    write_ints(&mut session, &[[Some(1), Some(1)]]);

    store.inject_fault(Fault::DataAppend);
    let result = session.write_values(&ints([Some(2), Some(2)]));

    assert!(matches!(result, Err(StripeError::Storage(_))));
    assert_eq!(session.state(), SessionState::Poisoned);
    assert!(matches!(
        session.write_values(&ints([Some(3), Some(3)])),
        Err(StripeError::SessionPoisoned)
    ));
    assert!(matches!(
        session.write_values(&[Value::Null]),
        Err(StripeError::SessionPoisoned)
    ));
    assert!(matches!(session.flush(), Err(StripeError::SessionPoisoned)));
    assert!(matches!(session.finish(), Err(StripeError::SessionPoisoned)));

    assert_eq!(FooterManager::read_pointer(store.as_ref()).unwrap(), None);
}

#[test]
fn test_failure_keeps_previous_footer() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let mut first = begin(&store, &config(2, 2));
    write_ints(&mut first, &[[Some(1), Some(10)], [Some(2), Some(20)]]);
    let committed = first.finish().unwrap().footer_pointer;

    let mut second = begin(&store, &config(2, 2));
    store.inject_fault(Fault::DataAppend);
    write_ints(&mut second, &[[Some(3), Some(30)]]);
    assert!(second.write_values(&ints([Some(4), Some(40)])).is_err());
    drop(second);

    assert_eq!(
        FooterManager::read_pointer(store.as_ref()).unwrap(),
        Some(committed)
    );
    assert_eq!(
        read_ints(&store),
        vec![[Some(1), Some(10)], [Some(2), Some(20)]]
    );
}

#[test]
fn test_crash_before_pointer_flip() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let committed = vec![[Some(1), Some(10)], [Some(2), Some(20)]];

    let mut first = begin(&store, &config(2, 100));
    write_ints(&mut first, &committed);
    first.finish().unwrap();

    let mut second = begin(&store, &config(2, 100));
    write_ints(&mut second, &[[Some(3), Some(30)]]);
    store.inject_fault(Fault::PointerWrite);
    assert!(second.finish().is_err());

    // The stripe and footer blocks of the failed finish are not visible
    assert_eq!(read_ints(&store), committed);

    let mut third = begin(&store, &config(2, 100));
    write_ints(&mut third, &[[Some(5), None]]);
    third.finish().unwrap();

    let mut expected = committed;
    expected.push([Some(5), None]);
    assert_eq!(read_ints(&store), expected);
}

// =============================================================================
// Resume Tests
// =============================================================================

#[test]
fn test_abandoned_session_discarded_on_resume() {
    let store = Arc::new(MemoryBlockStore::new(64));
    {
        let mut abandoned = begin(&store, &config(2, 2));
        write_ints(
            &mut abandoned,
            &[
                [Some(1), Some(1)],
                [Some(2), Some(2)],
                [Some(3), Some(3)],
                [Some(4), Some(4)],
                [Some(5), Some(5)],
            ],
        );
        assert_eq!(abandoned.footer().stripes.len(), 2);
    }

    assert!(store.data_len().unwrap() > 0);
    assert!(read_ints(&store).is_empty());

    let mut session = begin(&store, &config(2, 2));
    assert_eq!(store.data_len().unwrap(), 0);
    assert_eq!(session.file_offset(), 0);

    write_ints(&mut session, &[[Some(7), Some(70)]]);
    session.finish().unwrap();

    assert_eq!(read_ints(&store), vec![[Some(7), Some(70)]]);
}

#[test]
fn test_resume_appends_after_committed_stripes() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let first_rows: Vec<IntRow> = (1..=5).map(|i| [Some(i), None]).collect();
    let second_rows: Vec<IntRow> = (6..=8).map(|i| [None, Some(i)]).collect();

    let mut first = begin(&store, &config(2, 100));
    write_ints(&mut first, &first_rows);
    first.finish().unwrap();

    // A different block row count does not apply to an existing table
    let mut second = begin(&store, &config(3, 100));
    assert_eq!(second.footer().stripes.len(), 1);
    write_ints(&mut second, &second_rows);
    let summary = second.finish().unwrap();

    assert_eq!(summary.rows_written, 3);
    assert_eq!(summary.stripes_written, 1);
    assert_eq!(summary.total_stripes, 2);

    let reader = TableReader::open(store.clone(), int_schema()).unwrap();
    assert_eq!(reader.block_row_count(), 2);
    assert_eq!(reader.stripes()[1].file_offset, reader.stripes()[0].end_offset());
    assert_eq!(reader.read_skip_list(1, 1).unwrap().len(), 2);

    let mut expected = first_rows;
    expected.extend(second_rows);
    assert_eq!(read_ints(&store), expected);
}

#[test]
fn test_unusable_pointer_preserves_committed_data() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let rows: Vec<IntRow> = (0..4).map(|i| [Some(i), Some(i * 10)]).collect();

    let mut first = begin(&store, &config(2, 4));
    write_ints(&mut first, &rows);
    let committed = first.finish().unwrap().footer_pointer;
    let data_len = store.data_len().unwrap();

    let malformed = [0xff, 0xff, 0xff];
    let out_of_extent = FooterPointer::new(9, 1).encode();
    for pointer in [&malformed[..], &out_of_extent[..]] {
        store.write_fixed_pointer(pointer).unwrap();

        let result = WriteSession::begin(store.clone(), int_schema(), &config(2, 4));
        assert!(matches!(result, Err(StripeError::Corruption(_))));
        assert_eq!(store.data_len().unwrap(), data_len);
    }

    // Restoring the pointer makes every committed row readable again
    store.write_fixed_pointer(&committed.encode()).unwrap();
    assert_eq!(read_ints(&store), rows);
}

#[test]
fn test_unusable_pointer_on_empty_data_starts_fresh() {
    let store = Arc::new(MemoryBlockStore::new(64));
    store.write_fixed_pointer(&[1, 2, 3]).unwrap();

    let mut session = begin(&store, &config(2, 4));
    write_ints(&mut session, &[[Some(1), Some(2)]]);
    let summary = session.finish().unwrap();

    assert_eq!(summary.footer_pointer, FooterPointer::new(1, 1));
    assert_eq!(read_ints(&store), vec![[Some(1), Some(2)]]);
}

#[test]
fn test_truncated_data_is_corruption() {
    let store = Arc::new(MemoryBlockStore::new(64));
    let mut first = begin(&store, &config(2, 100));
    write_ints(&mut first, &[[Some(1), Some(1)]]);
    first.finish().unwrap();

    let len = store.data_len().unwrap();
    store.truncate_data(len - 1).unwrap();

    let result = WriteSession::begin(store.clone(), int_schema(), &config(2, 100));
    assert!(matches!(result, Err(StripeError::Corruption(_))));
}
