//! Tests for payload serialization
//!
//! These tests verify:
//! - Fixed-width and length-prefixed encodings
//! - Strict decoding (bad bool bytes, truncated prefixes, bad UTF-8)
//! - `value ++ key` entry framing with and without keys
//! - Sequential decoding of several items from one payload

use beardb::serial::{encode_entry, encode_items, Bincode, PayloadReader, Serial};
use beardb::BearError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

// =============================================================================
// Helper Functions
// =============================================================================

fn encode<T: Serial>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.serialize(&mut buf).unwrap();
    buf
}

fn decode<T: Serial>(bytes: &[u8]) -> beardb::Result<T> {
    let mut slice = bytes;
    T::deserialize(&mut slice)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Account {
    owner: String,
    balance: i64,
    tags: Vec<String>,
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_fixed_width_encodings() {
    assert_eq!(encode(&7u8), vec![7]);
    assert_eq!(encode(&-2i32), (-2i32).to_le_bytes().to_vec());
    assert_eq!(encode(&0xdead_beefu32), 0xdead_beefu32.to_le_bytes().to_vec());
    assert_eq!(encode(&1.5f64).len(), 8);
    assert_eq!(encode(&()).len(), 0);

    assert_eq!(decode::<i64>(&encode(&-99i64)).unwrap(), -99);
    assert_eq!(decode::<f32>(&encode(&2.25f32)).unwrap(), 2.25);
}

#[test]
fn test_string_is_length_prefixed() {
    let bytes = encode(&"bear".to_string());
    assert_eq!(&bytes[0..4], &4u32.to_le_bytes());
    assert_eq!(&bytes[4..], b"bear");
    assert_eq!(decode::<String>(&bytes).unwrap(), "bear");
}

#[test]
fn test_bool_rejects_other_bytes() {
    assert!(decode::<bool>(&[1]).unwrap());
    assert!(!decode::<bool>(&[0]).unwrap());
    assert!(matches!(decode::<bool>(&[2]), Err(BearError::Decoding(_))));
}

#[test]
fn test_truncated_input_is_a_decoding_error() {
    assert!(matches!(decode::<u64>(&[1, 2, 3]), Err(BearError::Decoding(_))));

    let mut bytes = encode(&vec![1u8, 2, 3, 4]);
    bytes.truncate(6);
    assert!(matches!(decode::<Vec<u8>>(&bytes), Err(BearError::Decoding(_))));
}

#[test]
fn test_invalid_utf8_is_a_decoding_error() {
    let bytes = encode(&vec![0xffu8, 0xfe]);
    assert!(matches!(decode::<String>(&bytes), Err(BearError::Decoding(_))));
}

#[test]
fn test_bincode_wrapper() {
    let account = Account {
        owner: "ursa".to_string(),
        balance: -40,
        tags: vec!["brown".to_string(), "grizzly".to_string()],
    };
    let bytes = encode(&Bincode(account.clone()));
    assert_eq!(decode::<Bincode<Account>>(&bytes).unwrap().0, account);
}

// =============================================================================
// Framing Tests
// =============================================================================

#[test]
fn test_entry_frames_value_then_key() {
    let payload = encode_entry(&"k".to_string(), &5u32, true).unwrap();

    let mut expected = 5u32.to_le_bytes().to_vec();
    expected.extend_from_slice(&encode(&"k".to_string()));
    assert_eq!(payload.as_ref(), expected.as_slice());
}

#[test]
fn test_entry_without_key() {
    let payload = encode_entry(&"ignored".to_string(), &5u32, false).unwrap();
    assert_eq!(payload.as_ref(), &5u32.to_le_bytes());
}

#[test]
fn test_reader_decodes_items_in_order() {
    let payload = encode_items(&[10u64, 20, 30]).unwrap();
    let mut reader = PayloadReader::new(payload);

    assert_eq!(reader.next_item::<u64>().unwrap(), 10);
    assert_eq!(reader.position(), 8);
    assert_eq!(reader.next_item::<u64>().unwrap(), 20);
    assert_eq!(reader.next_item::<u64>().unwrap(), 30);
    assert_eq!(reader.remaining(), 0);
    assert!(reader.next_item::<u64>().is_err());
}

#[test]
fn test_reader_ignores_trailing_slack() {
    let mut bytes = encode(&"value".to_string());
    bytes.extend_from_slice(&[0u8; 6]);

    let mut reader = PayloadReader::new(Bytes::from(bytes));
    assert_eq!(reader.next_item::<String>().unwrap(), "value");
    assert_eq!(reader.remaining(), 6);
}
