//! Tombstones and compaction
//!
//! Deletion marks records free without moving anything; defrag merges runs
//! of adjacent tombstones into one larger slot; a rescan rebuilds the whole
//! free-space index from the record walk.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::record::{RecordHeader, DATA_START, HEADER_SIZE, MAX_LENGTH};

use super::Engine;

/// Outcome of a defrag pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefragReport {
    /// Runs of adjacent tombstones that were merged
    pub runs_merged: usize,
    /// Tombstones folded into those runs (including each run's first)
    pub records_merged: usize,
    /// Capacity gained from headers that became payload
    pub bytes_reclaimed: u64,
}

impl Engine {
    /// Mark a record deleted and hand its slot to the free-space index.
    ///
    /// Deleting a tombstone is a no-op. Deleting a redirect also frees the
    /// relocated body, which nothing else can reach.
    pub fn delete(&self, id: u64) -> Result<()> {
        self.require_mutable("delete")?;

        let mut free = self.free_index.write();
        let offset = self.check_owned_id(&free, id)?;
        let header = self.read_header(offset)?;
        if header.deleted {
            return Ok(());
        }

        let target = if header.redirected {
            Some(self.read_target(id, header)?)
        } else {
            None
        };

        self.write_header(offset, header.into_deleted())?;
        free.insert(id, header.length());

        if let Some((target, target_header)) = target {
            self.write_header(target, target_header.into_deleted())?;
            free.unmark_relocated(target);
            free.insert(target + HEADER_SIZE, target_header.length());
        }
        Ok(())
    }

    /// Merge adjacent tombstones between `begin` and `end`.
    ///
    /// Runs start at the first record whose id is at or after `begin`; any
    /// `begin` works, boundaries are found by walking from the start of the
    /// data region. `end` is a byte offset, clamped to the current size;
    /// runs only include tombstones whose header starts before it. Live
    /// records are never touched.
    pub fn defrag(&self, begin: u64, end: u64) -> Result<DefragReport> {
        self.require_mutable("defrag")?;

        let mut free = self.free_index.write();
        let size = self.backend.size();
        let end = end.min(size);
        let mut report = DefragReport::default();

        let mut pos = DATA_START;
        while pos + HEADER_SIZE <= end {
            let header = self.read_header(pos)?;
            let next = header.next_header(pos);
            if next > size {
                warn!(offset = pos, size, "record runs past the end of storage, stopping defrag");
                break;
            }
            if !header.deleted || pos + HEADER_SIZE < begin {
                pos = next;
                continue;
            }

            let mut total = header.length() as u64;
            let mut merged = vec![pos + HEADER_SIZE];
            let mut cursor = next;
            while cursor + HEADER_SIZE <= end {
                let following = self.read_header(cursor)?;
                let following_end = following.next_header(cursor);
                if !following.deleted || following_end > size {
                    break;
                }
                let grown = total + HEADER_SIZE + following.length() as u64;
                if grown > MAX_LENGTH as u64 {
                    break;
                }
                total = grown;
                merged.push(cursor + HEADER_SIZE);
                cursor = following_end;
            }

            if merged.len() > 1 {
                for id in &merged {
                    free.remove(*id);
                }
                self.write_header(pos, RecordHeader::tombstone(total)?)?;
                free.insert(pos + HEADER_SIZE, total as u32);

                report.runs_merged += 1;
                report.records_merged += merged.len();
                report.bytes_reclaimed += (merged.len() as u64 - 1) * HEADER_SIZE;
            }
            pos = cursor;
        }

        info!(
            runs = report.runs_merged,
            records = report.records_merged,
            reclaimed = report.bytes_reclaimed,
            "defrag complete"
        );
        Ok(report)
    }

    /// Rebuild the free-space index by walking every record.
    ///
    /// Every tombstone with a non-zero length becomes a slot, including
    /// margins and bodies orphaned by a moved redirect. Returns the number
    /// of slots.
    pub fn rebuild_free_index(&self) -> Result<usize> {
        self.rescan(true)
    }

    /// Walk every record, re-marking relocated bodies and, if `register_free`,
    /// re-registering tombstones. Returns the number of free slots.
    pub(super) fn rescan(&self, register_free: bool) -> Result<usize> {
        let mut free = self.free_index.write();
        free.clear();

        let size = self.backend.size();
        let mut pos = DATA_START;
        while pos + HEADER_SIZE <= size {
            let header = self.read_header(pos)?;
            let next = header.next_header(pos);
            if next > size {
                warn!(offset = pos, size, "record runs past the end of storage, stopping rescan");
                break;
            }
            if header.deleted {
                if register_free {
                    free.insert(pos + HEADER_SIZE, header.length());
                }
            } else if header.redirected {
                match self.read_pointer(pos + HEADER_SIZE, header) {
                    Ok(target) => free.mark_relocated(target),
                    Err(e) => warn!(offset = pos, error = %e, "skipping unreadable redirect"),
                }
            }
            pos = next;
        }

        debug!(
            slots = free.len(),
            bytes = free.total_free(),
            relocated = free.relocated().count(),
            "rebuilt free-space index"
        );
        Ok(free.len())
    }
}
