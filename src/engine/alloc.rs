//! Allocation
//!
//! Decides where a new record goes: an existing free slot (split when it is
//! large enough), or the end of storage followed by a margin.

use tracing::trace;

use crate::error::Result;
use crate::free_space::FreeSpaceIndex;
use crate::record::{checked_length, header_offset, RecordHeader, HEADER_SIZE};

use super::Engine;

impl Engine {
    /// Store a payload and return its id.
    ///
    /// Reuses the smallest free slot that fits; appends only when none does.
    /// Append-only stores always append.
    pub fn insert(&self, payload: &[u8]) -> Result<u64> {
        checked_length(payload.len() as u64)?;

        let mut free = self.free_index.write();
        if self.config.mutable {
            self.place(&mut free, payload)
        } else {
            self.append_locked(payload)
        }
    }

    /// Store a payload at the end of storage, bypassing free-space reuse
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        checked_length(payload.len() as u64)?;

        let _guard = self.free_index.write();
        self.append_locked(payload)
    }

    /// Allocate and write a live record (lock held)
    pub(super) fn place(&self, free: &mut FreeSpaceIndex, payload: &[u8]) -> Result<u64> {
        let required = checked_length(payload.len() as u64)?;

        let Some((id, capacity)) = free.take_fit(required) else {
            return self.append_locked(payload);
        };

        match self.fill_slot(free, id, capacity, payload, true) {
            Ok(()) => Ok(id),
            Err(e) => {
                free.insert(id, capacity);
                Err(e)
            }
        }
    }

    /// Write a live record into `capacity` bytes at `id`.
    ///
    /// A remainder of at least a header plus `min_fragment` bytes becomes a
    /// tombstone right after the payload (indexed if `index_remainder`);
    /// a smaller one stays inside the record's length.
    pub(super) fn fill_slot(
        &self,
        free: &mut FreeSpaceIndex,
        id: u64,
        capacity: u32,
        payload: &[u8],
        index_remainder: bool,
    ) -> Result<()> {
        let required = payload.len() as u64;
        let remainder = capacity as u64 - required;
        let split = remainder >= HEADER_SIZE + self.config.min_fragment as u64;

        let length = if split { required } else { capacity as u64 };
        let mut buf = Vec::with_capacity(2 * HEADER_SIZE as usize + payload.len());
        buf.extend_from_slice(&RecordHeader::live(length)?.encode());
        buf.extend_from_slice(payload);

        let rest = remainder.saturating_sub(HEADER_SIZE);
        if split {
            buf.extend_from_slice(&RecordHeader::tombstone(rest)?.encode());
        }

        self.backend.write_all_at(header_offset(id), &buf)?;

        if split && index_remainder {
            free.insert(id + required + HEADER_SIZE, rest as u32);
        }
        trace!(id, capacity, required, split, "filled free slot");
        Ok(())
    }

    /// Write `header ++ payload ++ margin` at the end of storage (lock held)
    pub(super) fn append_locked(&self, payload: &[u8]) -> Result<u64> {
        let offset = self.backend.size();
        let margin = self.config.margin as u64;

        let mut buf = Vec::with_capacity(HEADER_SIZE as usize + payload.len() + margin as usize);
        buf.extend_from_slice(&RecordHeader::live(payload.len() as u64)?.encode());
        buf.extend_from_slice(payload);

        if margin > 0 {
            // Unindexed tombstone: keeps the layout walkable, only absorbed by growth
            buf.extend_from_slice(&RecordHeader::tombstone(margin - HEADER_SIZE)?.encode());
            buf.resize(buf.len() + (margin - HEADER_SIZE) as usize, 0);
        }

        self.backend.write_all_at(offset, &buf)?;

        let id = offset + HEADER_SIZE;
        trace!(id, length = payload.len(), margin, "appended record");
        Ok(id)
    }
}
