//! File preamble
//!
//! Identifies a BearDB store and records the mode it was created with.

use crate::backend::Backend;
use crate::error::{BearError, Result};

/// Magic bytes identifying a BearDB store
pub const MAGIC: &[u8; 4] = b"BEAR";

/// Current record format version
pub const FORMAT_VERSION: u16 = 1;

/// Preamble size: Magic (4) + Version (2) + Flags (2) + Reserved (8) = 16 bytes
pub const PREAMBLE_SIZE: u64 = 16;

const FLAG_PERSIST_KEYS: u16 = 1;
const FLAG_MUTABLE: u16 = 1 << 1;

/// Mode flags stored at the start of every store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preamble {
    pub persist_keys: bool,
    pub mutable: bool,
}

impl Preamble {
    pub fn encode(&self) -> [u8; PREAMBLE_SIZE as usize] {
        let mut flags = 0u16;
        if self.persist_keys {
            flags |= FLAG_PERSIST_KEYS;
        }
        if self.mutable {
            flags |= FLAG_MUTABLE;
        }

        let mut buf = [0u8; PREAMBLE_SIZE as usize];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf[6..8].copy_from_slice(&flags.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; PREAMBLE_SIZE as usize]) -> Result<Self> {
        if &buf[0..4] != MAGIC {
            return Err(BearError::Format(format!(
                "Invalid magic: expected BEAR, got {:?}",
                &buf[0..4]
            )));
        }

        let version = u16::from_le_bytes([buf[4], buf[5]]);
        if version != FORMAT_VERSION {
            return Err(BearError::Format(format!(
                "Unsupported format version: {}",
                version
            )));
        }

        let flags = u16::from_le_bytes([buf[6], buf[7]]);
        Ok(Self {
            persist_keys: flags & FLAG_PERSIST_KEYS != 0,
            mutable: flags & FLAG_MUTABLE != 0,
        })
    }

    /// Read the preamble of a backend; `None` if the backend is empty
    pub fn read_from(backend: &dyn Backend) -> Result<Option<Self>> {
        let size = backend.size();
        if size == 0 {
            return Ok(None);
        }
        if size < PREAMBLE_SIZE {
            return Err(BearError::Format(format!(
                "Store is {} bytes, shorter than its preamble",
                size
            )));
        }

        let mut buf = [0u8; PREAMBLE_SIZE as usize];
        backend.read_exact_at(0, &mut buf)?;
        Self::decode(&buf).map(Some)
    }

    pub fn write_to(&self, backend: &dyn Backend) -> Result<()> {
        backend.write_all_at(0, &self.encode())?;
        Ok(())
    }
}
