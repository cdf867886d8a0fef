//! Tests for MemoryBlockStore

use stripestore::store::{BlockStore, Fault, MemoryBlockStore};
use stripestore::StripeError;

#[test]
fn test_data_stream() {
    let store = MemoryBlockStore::new(32);

    assert_eq!(store.append_data(b"abc").unwrap(), 0);
    assert_eq!(store.append_data(b"de").unwrap(), 3);
    assert_eq!(store.data(), b"abcde");

    store.truncate_data(1).unwrap();
    assert_eq!(store.data_len().unwrap(), 1);
    assert!(store.read_data(0, 2).is_err());
}

#[test]
fn test_footer_blocks_and_pointer() {
    let store = MemoryBlockStore::new(8);

    assert_eq!(store.read_fixed_pointer().unwrap(), None);
    store.write_footer_block(2, b"blk").unwrap();

    assert_eq!(store.footer_block_count().unwrap(), 3);
    assert_eq!(store.read_fixed_pointer().unwrap(), None);
    assert!(store.read_footer_block(1).unwrap().is_empty());

    store.write_fixed_pointer(&[1; 8]).unwrap();
    assert_eq!(store.read_fixed_pointer().unwrap(), Some(vec![1; 8]));
    assert!(store.read_footer_block(3).is_err());
    assert!(store.write_footer_block(1, &[0; 9]).is_err());
}

#[test]
fn test_faults_fire_once() {
    let store = MemoryBlockStore::new(8);
    store.inject_fault(Fault::DataAppend);
    store.inject_fault(Fault::PointerWrite);

    assert!(matches!(
        store.append_data(b"x"),
        Err(StripeError::Storage(_))
    ));
    assert_eq!(store.append_data(b"x").unwrap(), 0);

    // Unrelated operations are unaffected
    store.write_footer_block(1, b"ok").unwrap();

    assert!(store.write_fixed_pointer(&[1; 8]).is_err());
    assert_eq!(store.read_fixed_pointer().unwrap(), None);
    store.write_fixed_pointer(&[1; 8]).unwrap();
}
