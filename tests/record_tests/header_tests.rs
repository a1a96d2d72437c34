//! Tests for the record header and file preamble
//!
//! These tests verify:
//! - Bit layout of the 4-byte header (deleted, redirected, 30-bit length)
//! - Length limit enforcement
//! - Preamble encoding, mode flags and format validation

use beardb::record::{
    header_offset, Preamble, RecordHeader, DATA_START, FIRST_ID, HEADER_SIZE, MAX_LENGTH,
    PREAMBLE_SIZE,
};
use beardb::{Backend, BearError, MemoryBackend};

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_header_bit_layout() {
    let header = RecordHeader::new(true, false, 10).unwrap();
    assert_eq!(u32::from_le_bytes(header.encode()), (1 << 31) | 10);

    let header = RecordHeader::new(false, true, 10).unwrap();
    assert_eq!(u32::from_le_bytes(header.encode()), (1 << 30) | 10);

    let header = RecordHeader::live(MAX_LENGTH as u64).unwrap();
    assert_eq!(u32::from_le_bytes(header.encode()), MAX_LENGTH);
}

#[test]
fn test_header_decode_every_flag_combination() {
    for (deleted, redirected) in [(false, false), (true, false), (false, true), (true, true)] {
        let header = RecordHeader::new(deleted, redirected, 1234).unwrap();
        let decoded = RecordHeader::decode(header.encode());

        assert_eq!(decoded.deleted, deleted);
        assert_eq!(decoded.redirected, redirected);
        assert_eq!(decoded.length(), 1234);
    }
}

#[test]
fn test_header_rejects_oversized_length() {
    let result = RecordHeader::live(MAX_LENGTH as u64 + 1);
    assert!(matches!(
        result,
        Err(BearError::CapacityExceeded { needed, .. }) if needed == MAX_LENGTH as u64 + 1
    ));
}

#[test]
fn test_header_flag_transitions_keep_length() {
    let header = RecordHeader::live(42).unwrap();

    let deleted = header.into_deleted();
    assert!(deleted.deleted);
    assert!(!deleted.redirected);
    assert_eq!(deleted.length(), 42);

    let redirected = header.into_redirected();
    assert!(redirected.redirected);
    assert!(!redirected.deleted);
    assert_eq!(redirected.length(), 42);
}

#[test]
fn test_header_next_offset() {
    let header = RecordHeader::live(100).unwrap();
    assert_eq!(header.next_header(DATA_START), DATA_START + HEADER_SIZE + 100);
}

#[test]
fn test_id_and_header_offset() {
    assert_eq!(FIRST_ID, DATA_START + HEADER_SIZE);
    assert_eq!(header_offset(FIRST_ID), DATA_START);
}

// =============================================================================
// Preamble Tests
// =============================================================================

#[test]
fn test_preamble_layout() {
    let preamble = Preamble {
        persist_keys: true,
        mutable: false,
    };
    let bytes = preamble.encode();

    assert_eq!(bytes.len() as u64, PREAMBLE_SIZE);
    assert_eq!(&bytes[0..4], b"BEAR");
    assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 1);
    assert!(bytes[8..].iter().all(|b| *b == 0));
    assert_eq!(Preamble::decode(&bytes).unwrap(), preamble);
}

#[test]
fn test_preamble_bad_magic() {
    let mut bytes = Preamble {
        persist_keys: true,
        mutable: true,
    }
    .encode();
    bytes[0] = b'X';

    assert!(matches!(Preamble::decode(&bytes), Err(BearError::Format(_))));
}

#[test]
fn test_preamble_bad_version() {
    let mut bytes = Preamble {
        persist_keys: true,
        mutable: true,
    }
    .encode();
    bytes[4] = 9;

    assert!(matches!(Preamble::decode(&bytes), Err(BearError::Format(_))));
}

#[test]
fn test_preamble_read_from_backend() {
    let backend = MemoryBackend::new();
    assert_eq!(Preamble::read_from(&backend).unwrap(), None);

    let preamble = Preamble {
        persist_keys: false,
        mutable: true,
    };
    preamble.write_to(&backend).unwrap();
    assert_eq!(backend.size(), PREAMBLE_SIZE);
    assert_eq!(Preamble::read_from(&backend).unwrap(), Some(preamble));
}

#[test]
fn test_preamble_truncated_backend() {
    let backend = MemoryBackend::from_bytes(b"BEA".to_vec());
    assert!(matches!(
        Preamble::read_from(&backend),
        Err(BearError::Format(_))
    ));
}
