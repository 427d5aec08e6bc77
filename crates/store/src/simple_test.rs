//! Tests for the unbounded store

use bytes::Bytes;
use pulse_protocol::{DataType, Event, Header, SampleBlock};

use super::*;

fn byte_header() -> Header {
    Header::new(1, 0.0, DataType::U8)
}

fn byte_block(start: u64, columns: u64) -> SampleBlock {
    let data: Vec<u8> = (start..start + columns).map(|v| v as u8).collect();
    SampleBlock::new(1, columns, DataType::U8, Bytes::from(data)).unwrap()
}

#[test]
fn test_no_eviction_ever() {
    let store = SimpleDataStore::new();
    store.put_header(byte_header()).unwrap();

    for i in 0..100 {
        store.put_samples(&byte_block(i, 1)).unwrap();
    }

    assert_eq!(store.counts().samples, 100);
    // Index 0 stays retrievable no matter how much was written
    let block = store.get_samples(0, 100).unwrap();
    assert_eq!(block.columns(), 100);
    assert_eq!(block.data()[0], 0);
    assert_eq!(block.data()[99], 99);
}

#[test]
fn test_out_of_range_beyond_total() {
    let store = SimpleDataStore::new();
    store.put_header(byte_header()).unwrap();
    store.put_samples(&byte_block(0, 10)).unwrap();

    assert!(matches!(
        store.get_samples(5, 11),
        Err(DataError::OutOfRange { index: 11, total: 10 })
    ));
}

#[test]
fn test_requires_header() {
    let store = SimpleDataStore::new();
    assert!(matches!(
        store.put_samples(&byte_block(0, 1)),
        Err(DataError::NoHeader)
    ));
    assert!(matches!(
        store.put_events(vec![Event::marker("go", 0)]),
        Err(DataError::NoHeader)
    ));
    assert!(matches!(store.get_samples(0, 0), Err(DataError::NoHeader)));
}

#[test]
fn test_events_append_in_arrival_order() {
    let store = SimpleDataStore::new();
    store.put_header(byte_header()).unwrap();

    store.put_events(vec![Event::marker("a", 0)]).unwrap();
    store.put_events(vec![Event::marker("b", 1), Event::marker("c", 2)]).unwrap();

    let events = store.get_events(0, 3).unwrap();
    let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(kinds, vec!["a", "b", "c"]);
}

#[test]
fn test_flush_data_restarts_indices() {
    let store = SimpleDataStore::new();
    store.put_header(byte_header()).unwrap();
    store.put_samples(&byte_block(0, 10)).unwrap();
    store.put_events(vec![Event::marker("kept", 3)]).unwrap();

    store.flush_data();

    assert_eq!(store.counts().samples, 0);
    assert_eq!(store.counts().events, 1);

    store.put_samples(&byte_block(42, 1)).unwrap();
    assert_eq!(store.get_samples(0, 1).unwrap().data()[0], 42);
}

#[test]
fn test_flush_header_clears_everything() {
    let store = SimpleDataStore::new();
    store.put_header(byte_header()).unwrap();
    store.put_samples(&byte_block(0, 5)).unwrap();
    store.put_events(vec![Event::marker("gone", 0)]).unwrap();

    store.flush_header();

    assert!(matches!(store.get_header(), Err(DataError::NoHeader)));
    let counts = store.counts();
    assert_eq!(counts.samples, 0);
    assert_eq!(counts.events, 0);
}

#[test]
fn test_channel_mismatch_rejected() {
    let store = SimpleDataStore::new();
    store.put_header(Header::new(4, 100.0, DataType::U8)).unwrap();

    let block = SampleBlock::new(3, 2, DataType::U8, Bytes::from(vec![0u8; 6])).unwrap();
    assert!(matches!(
        store.put_samples(&block),
        Err(DataError::ChannelMismatch {
            expected: 4,
            actual: 3
        })
    ));
    assert_eq!(store.counts().samples, 0);
}
