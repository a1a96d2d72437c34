//! Tests for storage backends
//!
//! These tests verify:
//! - Positioned reads and writes on file and memory backends
//! - Size tracking as a high-water mark
//! - Gap filling and short reads past the end
//! - Persistence of file contents and memory snapshots

use std::sync::Arc;
use std::thread;

use beardb::{Backend, FileBackend, MemoryBackend};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_file() -> (TempDir, FileBackend) {
    let temp_dir = TempDir::new().unwrap();
    let backend = FileBackend::open(&temp_dir.path().join("data.bear")).unwrap();
    (temp_dir, backend)
}

/// Behaviour every backend must share
fn check_positioned_io(backend: &dyn Backend) {
    assert_eq!(backend.size(), 0);

    backend.write_all_at(0, b"hello").unwrap();
    assert_eq!(backend.size(), 5);

    backend.write_all_at(10, b"world").unwrap();
    assert_eq!(backend.size(), 15);

    // Overwrite inside the region does not move the end
    backend.write_all_at(1, b"EL").unwrap();
    assert_eq!(backend.size(), 15);

    let mut buf = [0u8; 15];
    backend.read_exact_at(0, &mut buf).unwrap();
    assert_eq!(&buf[0..5], b"hELlo");
    assert_eq!(&buf[10..15], b"world");

    let mut tail = [0u8; 4];
    assert_eq!(backend.read_at(15, &mut tail).unwrap(), 0);
    assert!(backend.read_exact_at(13, &mut tail).is_err());
}

// =============================================================================
// Memory Backend Tests
// =============================================================================

#[test]
fn test_memory_positioned_io() {
    check_positioned_io(&MemoryBackend::new());
}

#[test]
fn test_memory_gap_reads_zero() {
    let backend = MemoryBackend::new();
    backend.write_all_at(8, b"x").unwrap();

    let mut buf = [0xffu8; 8];
    backend.read_exact_at(0, &mut buf).unwrap();
    assert_eq!(buf, [0u8; 8]);
}

#[test]
fn test_memory_snapshot_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("snapshot.bin");

    let backend = MemoryBackend::with_capacity(64);
    backend.write_all_at(0, b"snapshot").unwrap();
    backend.save_to(&path).unwrap();

    let loaded = MemoryBackend::load_from(&path).unwrap();
    assert_eq!(loaded.to_bytes(), b"snapshot".to_vec());
    assert_eq!(loaded.size(), 8);
}

// =============================================================================
// File Backend Tests
// =============================================================================

#[test]
fn test_file_positioned_io() {
    let (_temp, backend) = setup_temp_file();
    check_positioned_io(&backend);
}

#[test]
fn test_file_reopen_keeps_contents() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.bear");

    {
        let backend = FileBackend::open(&path).unwrap();
        backend.write_all_at(0, b"persisted").unwrap();
        backend.close().unwrap();
    }

    let backend = FileBackend::open(&path).unwrap();
    assert_eq!(backend.size(), 9);
    assert_eq!(backend.path(), path.as_path());

    let mut buf = [0u8; 9];
    backend.read_exact_at(0, &mut buf).unwrap();
    assert_eq!(&buf, b"persisted");
}

#[test]
fn test_file_concurrent_disjoint_writes() {
    let (_temp, backend) = setup_temp_file();
    let backend = Arc::new(backend);

    let mut handles = vec![];
    for t in 0..4u8 {
        let backend = Arc::clone(&backend);
        handles.push(thread::spawn(move || {
            let offset = t as u64 * 100;
            backend.write_all_at(offset, &[t; 100]).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(backend.size(), 400);
    for t in 0..4u8 {
        let mut buf = [0u8; 100];
        backend.read_exact_at(t as u64 * 100, &mut buf).unwrap();
        assert!(buf.iter().all(|b| *b == t));
    }
}
