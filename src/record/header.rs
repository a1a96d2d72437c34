//! Record header codec
//!
//! Encodes and decodes the 4-byte bit-packed header in front of every payload.

use crate::error::{BearError, Result};

use super::{HEADER_SIZE, MAX_LENGTH};

const DELETED_BIT: u32 = 1 << 31;
const REDIRECTED_BIT: u32 = 1 << 30;
const LENGTH_MASK: u32 = MAX_LENGTH;

/// Decoded record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record is a tombstone (its bytes are still walkable)
    pub deleted: bool,
    /// Payload holds a pointer to the record's relocated body
    pub redirected: bool,
    length: u32,
}

impl RecordHeader {
    /// Build a header, rejecting lengths that do not fit in 30 bits
    pub fn new(deleted: bool, redirected: bool, length: u64) -> Result<Self> {
        Ok(Self {
            deleted,
            redirected,
            length: checked_length(length)?,
        })
    }

    /// Header of a plain live record
    pub fn live(length: u64) -> Result<Self> {
        Self::new(false, false, length)
    }

    /// Header of a free slot
    pub fn tombstone(length: u64) -> Result<Self> {
        Self::new(true, false, length)
    }

    /// Payload length in bytes
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Offset of the next header, given the offset of this one
    pub fn next_header(&self, header_offset: u64) -> u64 {
        header_offset + HEADER_SIZE + self.length as u64
    }

    /// Same header with the deleted flag set
    pub fn into_deleted(self) -> Self {
        Self {
            deleted: true,
            ..self
        }
    }

    /// Same header with the redirected flag set
    pub fn into_redirected(self) -> Self {
        Self {
            redirected: true,
            ..self
        }
    }

    /// Encode to 4 little-endian bytes
    pub fn encode(&self) -> [u8; 4] {
        let mut raw = self.length & LENGTH_MASK;
        if self.deleted {
            raw |= DELETED_BIT;
        }
        if self.redirected {
            raw |= REDIRECTED_BIT;
        }
        raw.to_le_bytes()
    }

    /// Decode from 4 little-endian bytes (every bit pattern is valid)
    pub fn decode(bytes: [u8; 4]) -> Self {
        let raw = u32::from_le_bytes(bytes);
        Self {
            deleted: raw & DELETED_BIT != 0,
            redirected: raw & REDIRECTED_BIT != 0,
            length: raw & LENGTH_MASK,
        }
    }
}

/// Validate a payload length against the 30-bit limit
pub(crate) fn checked_length(length: u64) -> Result<u32> {
    if length > MAX_LENGTH as u64 {
        return Err(BearError::CapacityExceeded {
            needed: length,
            available: MAX_LENGTH as u64,
        });
    }
    Ok(length as u32)
}

/// Where a record's bytes actually live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Payload is stored right after the header
    Direct { length: u32 },

    /// Payload was relocated; `target` is the header offset of the body,
    /// which is always a `Direct` record
    Redirect { length: u32, target: u64 },
}

impl Slot {
    /// Capacity of the slot at the record's own offset
    pub fn length(&self) -> u32 {
        match self {
            Slot::Direct { length } | Slot::Redirect { length, .. } => *length,
        }
    }
}
