//! Iteration and inspection
//!
//! Forward walks over the record layout. Each step takes the shared lock on
//! its own, so a walk sees concurrent writes (no snapshot).

use crate::error::Result;
use crate::free_space::FreeSpaceIndex;
use crate::record::{Slot, DATA_START, HEADER_SIZE};

use super::Engine;

/// Physical description of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordInfo {
    pub id: u64,
    pub deleted: bool,
    pub slot: Slot,
}

impl RecordInfo {
    pub fn is_redirected(&self) -> bool {
        matches!(self.slot, Slot::Redirect { .. })
    }

    /// Header offset of the relocated body, for redirects
    pub fn target(&self) -> Option<u64> {
        match self.slot {
            Slot::Redirect { target, .. } => Some(target),
            Slot::Direct { .. } => None,
        }
    }
}

/// Whole-store counters gathered by a full walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub size: u64,
    /// Records addressable by id (direct and redirected)
    pub live_records: u64,
    pub deleted_records: u64,
    pub redirects: u64,
    /// Live bodies that belong to a redirect
    pub relocated_bodies: u64,
    pub free_slots: usize,
    pub free_bytes: u64,
    pub largest_free_slot: u32,
}

impl Engine {
    /// Id of the next live record after `id`, or `None` at the end.
    ///
    /// Relocated bodies of redirected records are skipped; their data is
    /// reached through the redirect's own id.
    pub fn next(&self, id: u64) -> Result<Option<u64>> {
        let free = self.free_index.read();
        let offset = self.check_id(id)?;
        let header = self.read_header(offset)?;
        self.next_live(&free, header.next_header(offset))
    }

    /// Id of the first live record
    pub fn first(&self) -> Result<Option<u64>> {
        let free = self.free_index.read();
        self.next_live(&free, DATA_START)
    }

    /// Iterate live ids in offset order
    pub fn ids(&self) -> Ids<'_> {
        Ids {
            engine: self,
            cursor: None,
            done: false,
        }
    }

    /// Iterate live ids that come after `id`
    pub fn ids_after(&self, id: u64) -> Ids<'_> {
        Ids {
            engine: self,
            cursor: Some(id),
            done: false,
        }
    }

    /// Describe the record at `id` without decoding its payload
    pub fn record_info(&self, id: u64) -> Result<RecordInfo> {
        let _guard = self.free_index.read();
        let header = self.read_header(self.check_id(id)?)?;

        let slot = if header.redirected {
            Slot::Redirect {
                length: header.length(),
                target: self.read_pointer(id, header)?,
            }
        } else {
            Slot::Direct {
                length: header.length(),
            }
        };

        Ok(RecordInfo {
            id,
            deleted: header.deleted,
            slot,
        })
    }

    /// Walk every record and count what is there
    pub fn stats(&self) -> Result<Stats> {
        let free = self.free_index.read();
        let size = self.backend.size();

        let mut stats = Stats {
            size,
            free_slots: free.len(),
            free_bytes: free.total_free(),
            largest_free_slot: free.largest(),
            ..Stats::default()
        };

        let mut pos = DATA_START;
        while pos + HEADER_SIZE <= size {
            let header = self.read_header(pos)?;
            if header.deleted {
                stats.deleted_records += 1;
            } else if free.is_relocated(pos) {
                stats.relocated_bodies += 1;
            } else {
                stats.live_records += 1;
                if header.redirected {
                    stats.redirects += 1;
                }
            }
            pos = header.next_header(pos);
        }
        Ok(stats)
    }

    /// First addressable record whose header is at or after `pos` (lock held)
    fn next_live(&self, free: &FreeSpaceIndex, mut pos: u64) -> Result<Option<u64>> {
        let size = self.backend.size();
        while pos + HEADER_SIZE <= size {
            let header = self.read_header(pos)?;
            if !header.deleted && !free.is_relocated(pos) {
                return Ok(Some(pos + HEADER_SIZE));
            }
            pos = header.next_header(pos);
        }
        Ok(None)
    }
}

/// Lazy iterator over live record ids, built on [`Engine::next`]
pub struct Ids<'a> {
    engine: &'a Engine,
    cursor: Option<u64>,
    done: bool,
}

impl<'a> Iterator for Ids<'a> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let step = match self.cursor {
            None => self.engine.first(),
            Some(id) => self.engine.next(id),
        };

        match step {
            Ok(Some(id)) => {
                self.cursor = Some(id);
                Some(Ok(id))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
