//! Modification and overflow redirection
//!
//! A record keeps its id for life. When new bytes do not fit its slot, the
//! engine first tries to absorb a directly following tombstone; failing
//! that, the body moves elsewhere and the original slot becomes an 8-byte
//! pointer to it. Pointers are followed exactly one hop.

use tracing::trace;

use crate::error::{BearError, Result};
use crate::free_space::FreeSpaceIndex;
use crate::record::{
    checked_length, header_offset, RecordHeader, HEADER_SIZE, MAX_LENGTH, POINTER_SIZE,
};

use super::Engine;

impl Engine {
    /// Replace a record's payload, relocating it if it no longer fits
    pub fn modify(&self, id: u64, payload: &[u8]) -> Result<()> {
        self.require_mutable("modify")?;
        let needed = checked_length(payload.len() as u64)?;

        let mut free = self.free_index.write();
        let offset = self.check_owned_id(&free, id)?;
        let header = self.read_header(offset)?;
        if header.deleted {
            return Err(BearError::RecordDeleted(id));
        }

        if !header.redirected {
            if needed <= header.length() {
                self.backend.write_all_at(id, payload)?;
                return Ok(());
            }
            if self.grow_in_place(&mut free, id, header, payload)? {
                return Ok(());
            }
            if (header.length() as u64) < POINTER_SIZE {
                return Err(BearError::CapacityExceeded {
                    needed: POINTER_SIZE,
                    available: header.length() as u64,
                });
            }

            let target_id = self.place(&mut free, payload)?;
            let mut buf = Vec::with_capacity((HEADER_SIZE + POINTER_SIZE) as usize);
            buf.extend_from_slice(&header.into_redirected().encode());
            buf.extend_from_slice(&header_offset(target_id).to_le_bytes());
            self.backend.write_all_at(offset, &buf)?;
            free.mark_relocated(header_offset(target_id));

            trace!(id, target_id, "redirected record");
            return Ok(());
        }

        let (target, target_header) = self.read_target(id, header)?;
        let target_id = target + HEADER_SIZE;
        if needed <= target_header.length() {
            self.backend.write_all_at(target_id, payload)?;
            return Ok(());
        }
        if self.grow_in_place(&mut free, target_id, target_header, payload)? {
            return Ok(());
        }

        let new_target_id = self.place(&mut free, payload)?;
        self.backend
            .write_all_at(id, &header_offset(new_target_id).to_le_bytes())?;
        free.mark_relocated(header_offset(new_target_id));
        // Old body is unreachable now; left out of the index until defrag/rescan
        self.write_header(target, target_header.into_deleted())?;
        free.unmark_relocated(target);

        trace!(id, old_target = target_id, new_target_id, "moved redirect target");
        Ok(())
    }

    /// Overwrite a record's payload without growing it.
    ///
    /// Follows a redirect. Fails with `CapacityExceeded` when the payload is
    /// larger than the slot. Available on append-only stores.
    /// Relocated bodies are rejected with `InvalidId`, as in `modify`.
    pub fn rewrite(&self, id: u64, payload: &[u8]) -> Result<()> {
        let free = self.free_index.write();
        let offset = self.check_owned_id(&free, id)?;
        let header = self.read_header(offset)?;
        if header.deleted {
            return Err(BearError::RecordDeleted(id));
        }

        let (body_id, capacity) = if header.redirected {
            let (target, target_header) = self.read_target(id, header)?;
            (target + HEADER_SIZE, target_header.length())
        } else {
            (id, header.length())
        };

        if payload.len() as u64 > capacity as u64 {
            return Err(BearError::CapacityExceeded {
                needed: payload.len() as u64,
                available: capacity as u64,
            });
        }
        self.backend.write_all_at(body_id, payload)?;
        Ok(())
    }

    /// Grow the direct record at `id` over the tombstone right behind it.
    ///
    /// Returns `false` (nothing written) when there is no such tombstone or
    /// the combined space is still too small.
    fn grow_in_place(
        &self,
        free: &mut FreeSpaceIndex,
        id: u64,
        header: RecordHeader,
        payload: &[u8],
    ) -> Result<bool> {
        let size = self.backend.size();
        let next = header.next_header(header_offset(id));
        if next + HEADER_SIZE > size {
            return Ok(false);
        }

        let neighbour = self.read_header(next)?;
        if !neighbour.deleted || neighbour.next_header(next) > size {
            return Ok(false);
        }

        let combined = header.length() as u64 + HEADER_SIZE + neighbour.length() as u64;
        if combined < payload.len() as u64 || combined > MAX_LENGTH as u64 {
            return Ok(false);
        }

        let neighbour_id = next + HEADER_SIZE;
        let indexed = free.remove(neighbour_id).is_some();
        if let Err(e) = self.fill_slot(free, id, combined as u32, payload, indexed) {
            if indexed {
                free.insert(neighbour_id, neighbour.length());
            }
            return Err(e);
        }

        trace!(id, absorbed = neighbour_id, combined, "grew record in place");
        Ok(true)
    }
}
