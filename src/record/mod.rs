//! Record Module
//!
//! On-disk framing of a BearDB store.
//!
//! ## File Layout
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Preamble (16 bytes)                                      │
//! │   Magic: "BEAR" (4) | Version: u16 | Flags: u16 | 0 (8)  │
//! ├──────────────────────────────────────────────────────────┤
//! │ Record                                                   │
//! │   [Header: u32][Payload: value ++ key]                   │
//! ├──────────────────────────────────────────────────────────┤
//! │ Record (deleted, length kept so the walk can skip it)    │
//! ├──────────────────────────────────────────────────────────┤
//! │ Record (redirected, payload = u64 target header offset)  │
//! │ ... repeated up to the end of storage ...                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Header Bits
//! ```text
//!  31        30          29 ............................ 0
//! ┌─────────┬────────────┬──────────────────────────────────┐
//! │ deleted │ redirected │ payload length (30 bits)         │
//! └─────────┴────────────┴──────────────────────────────────┘
//! ```
//!
//! A record id is the offset of its first payload byte (header offset + 4).

mod header;
mod preamble;

pub(crate) use header::checked_length;
pub use header::{RecordHeader, Slot};
pub use preamble::{Preamble, FORMAT_VERSION, MAGIC, PREAMBLE_SIZE};

/// Size of the fixed record header in bytes
pub const HEADER_SIZE: u64 = 4;

/// Largest payload length representable in the 30-bit length field
pub const MAX_LENGTH: u32 = (1 << 30) - 1;

/// Size of a redirect pointer (absolute header offset, u64 LE)
pub const POINTER_SIZE: u64 = 8;

/// Offset of the first record header
pub const DATA_START: u64 = PREAMBLE_SIZE;

/// Smallest id a record can have
pub const FIRST_ID: u64 = DATA_START + HEADER_SIZE;

/// Convert a record id to the offset of its header
#[inline]
pub fn header_offset(id: u64) -> u64 {
    id - HEADER_SIZE
}
