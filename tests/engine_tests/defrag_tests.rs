//! Tests for defragmentation and free-space rebuilds
//!
//! These tests verify:
//! - Adjacent tombstones merge into exactly one free slot
//! - Live records are never merged or moved
//! - The begin / end window limits which runs are merged, even when begin
//!   falls inside a live record
//! - Merged slots are reused by larger inserts
//! - Full rescans rebuild the same index deletions produced

use std::sync::Arc;

use beardb::record::HEADER_SIZE;
use beardb::{Config, Engine, FreeIndexRecovery, MemoryBackend};

// =============================================================================
// Helper Functions
// =============================================================================

fn memory_engine() -> Engine {
    Engine::open(Arc::new(MemoryBackend::new()), Config::default()).unwrap()
}

/// Insert `count` records of 20 bytes each
fn insert_records(engine: &Engine, count: u8) -> Vec<u64> {
    (0..count).map(|i| engine.insert(&[i; 20]).unwrap()).collect()
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_defrag_merges_adjacent_tombstones() {
    let engine = memory_engine();
    let ids = insert_records(&engine, 3);
    engine.delete(ids[0]).unwrap();
    engine.delete(ids[1]).unwrap();

    let report = engine.defrag(0, u64::MAX).unwrap();

    assert_eq!(report.runs_merged, 1);
    assert_eq!(report.records_merged, 2);
    assert_eq!(report.bytes_reclaimed, HEADER_SIZE);
    assert_eq!(engine.free_slots(), vec![(ids[0], 20 + 20 + HEADER_SIZE as u32)]);

    let info = engine.record_info(ids[0]).unwrap();
    assert!(info.deleted);
    assert_eq!(info.slot.length(), 44);
    assert_eq!(engine.first().unwrap(), Some(ids[2]));
}

#[test]
fn test_defrag_leaves_live_records_alone() {
    let engine = memory_engine();
    let ids = insert_records(&engine, 3);
    engine.delete(ids[0]).unwrap();
    engine.delete(ids[2]).unwrap();
    let size = engine.size();

    let report = engine.defrag(0, u64::MAX).unwrap();

    assert_eq!(report.runs_merged, 0);
    assert_eq!(engine.free_slots(), vec![(ids[0], 20), (ids[2], 20)]);
    assert_eq!(engine.read(ids[1]).unwrap().as_ref(), &[1u8; 20]);
    assert_eq!(engine.size(), size);
}

#[test]
fn test_defrag_merges_long_run() {
    let engine = memory_engine();
    let ids = insert_records(&engine, 6);
    for id in &ids[1..5] {
        engine.delete(*id).unwrap();
    }

    let report = engine.defrag(0, u64::MAX).unwrap();

    assert_eq!(report.records_merged, 4);
    assert_eq!(report.bytes_reclaimed, 3 * HEADER_SIZE);
    assert_eq!(engine.free_slots(), vec![(ids[1], 4 * 20 + 3 * 4)]);
    assert_eq!(engine.next(ids[0]).unwrap(), Some(ids[5]));
}

#[test]
fn test_defrag_window() {
    let engine = memory_engine();
    let ids = insert_records(&engine, 6);
    for i in [0, 1, 3, 4] {
        engine.delete(ids[i]).unwrap();
    }

    // Only the run starting at ids[3]
    engine.defrag(ids[3], u64::MAX).unwrap();
    assert_eq!(
        engine.free_slots(),
        vec![(ids[0], 20), (ids[1], 20), (ids[3], 44)]
    );

    // End stops right after the second header of the first run
    engine.defrag(0, ids[1]).unwrap();
    assert_eq!(engine.free_slots(), vec![(ids[0], 44), (ids[3], 44)]);
}

#[test]
fn test_defrag_begin_inside_live_record() {
    let engine = memory_engine();
    let x = engine.insert(&[1u8; 20]).unwrap();
    let y = engine.insert(&[2u8; 20]).unwrap();

    // Payload bytes that read as two empty tombstone headers
    let mut tricky = vec![0u8; 24];
    tricky[3] = 0x80;
    tricky[7] = 0x80;
    let live = engine.insert(&tricky).unwrap();

    let b = engine.insert(&[3u8; 20]).unwrap();
    let c = engine.insert(&[4u8; 20]).unwrap();
    for id in [x, y, b, c] {
        engine.delete(id).unwrap();
    }

    let report = engine.defrag(live + HEADER_SIZE, u64::MAX).unwrap();

    assert_eq!(report.runs_merged, 1);
    assert_eq!(engine.read(live).unwrap().as_ref(), tricky.as_slice());
    assert_eq!(engine.free_slots(), vec![(x, 20), (y, 20), (b, 44)]);

    let again = engine.insert(&[5u8; 40]).unwrap();
    assert_eq!(again, b);
    assert_eq!(engine.read(live).unwrap().as_ref(), tricky.as_slice());
}

#[test]
fn test_defrag_end_excludes_later_tombstones() {
    let engine = memory_engine();
    let ids = insert_records(&engine, 3);
    engine.delete(ids[0]).unwrap();
    engine.delete(ids[1]).unwrap();

    // Header of ids[1] starts at ids[1] - 4, which is not before this end
    engine.defrag(0, ids[1] - HEADER_SIZE).unwrap();
    assert_eq!(engine.free_slots(), vec![(ids[0], 20), (ids[1], 20)]);
}

#[test]
fn test_merged_slot_is_reused() {
    let engine = memory_engine();
    let ids = insert_records(&engine, 3);
    engine.delete(ids[0]).unwrap();
    engine.delete(ids[1]).unwrap();
    engine.defrag(0, u64::MAX).unwrap();
    let size = engine.size();

    let big = engine.insert(&[7u8; 40]).unwrap();

    assert_eq!(big, ids[0]);
    assert_eq!(engine.size(), size);
    assert_eq!(&engine.read(big).unwrap()[..40], &[7u8; 40]);
}

#[test]
fn test_defrag_trailing_tombstones() {
    let engine = memory_engine();
    let ids = insert_records(&engine, 4);
    engine.delete(ids[2]).unwrap();
    engine.delete(ids[3]).unwrap();

    engine.defrag(0, u64::MAX).unwrap();

    assert_eq!(engine.free_slots(), vec![(ids[2], 44)]);
    assert_eq!(engine.next(ids[1]).unwrap(), None);
}

// =============================================================================
// Rebuild Tests
// =============================================================================

#[test]
fn test_rebuild_matches_deletions() {
    let engine = memory_engine();
    let ids = insert_records(&engine, 8);
    for i in [1, 2, 5, 7] {
        engine.delete(ids[i]).unwrap();
    }
    let expected = engine.free_slots();

    assert_eq!(engine.rebuild_free_index().unwrap(), 4);
    assert_eq!(engine.free_slots(), expected);
}

#[test]
fn test_rebuild_after_empty_recovery() {
    let backend = Arc::new(MemoryBackend::new());
    let engine = Engine::open(backend.clone(), Config::default()).unwrap();
    let ids = insert_records(&engine, 4);
    engine.delete(ids[1]).unwrap();
    engine.close().unwrap();

    let config = Config::builder()
        .free_index_recovery(FreeIndexRecovery::Empty)
        .build();
    let engine = Engine::open(backend, config).unwrap();
    assert!(engine.free_slots().is_empty());

    // Without an index inserts append
    let appended = engine.insert(&[9u8; 20]).unwrap();
    assert!(appended > ids[3]);

    engine.rebuild_free_index().unwrap();
    assert_eq!(engine.free_slots(), vec![(ids[1], 20)]);
    assert_eq!(engine.insert(&[8u8; 20]).unwrap(), ids[1]);
}

#[test]
fn test_rebuild_registers_margins() {
    let engine = Engine::open(
        Arc::new(MemoryBackend::new()),
        Config::builder().margin(16).build(),
    )
    .unwrap();
    let a = engine.insert(&[1u8; 8]).unwrap();
    assert!(engine.free_slots().is_empty());

    engine.rebuild_free_index().unwrap();
    assert_eq!(engine.free_slots(), vec![(a + 8 + HEADER_SIZE, 12)]);
}
