//! Free-space index persistence
//!
//! ## Sidecar Format
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ Magic: "BFRE" (4) | Version: u16 (2) | CRC32: u32 (4)     │
//! │ BodyLen: u64 (8)                                          │
//! ├───────────────────────────────────────────────────────────┤
//! │ Body: bincode Vec<(u64 id, u32 capacity)>                 │
//! │       + Vec<u64 relocated body header offset>             │
//! └───────────────────────────────────────────────────────────┘
//! ```

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BearError, Result};
use crate::record::{DATA_START, FIRST_ID};

use super::FreeSpaceIndex;

/// Magic bytes identifying a free-space sidecar
pub const SIDECAR_MAGIC: &[u8; 4] = b"BFRE";

/// Current sidecar format version
pub const SIDECAR_VERSION: u16 = 2;

/// Magic (4) + Version (2) + CRC (4) + BodyLen (8) = 18 bytes
const SIDECAR_HEADER_SIZE: usize = 18;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    slots: Vec<(u64, u32)>,
    relocated: Vec<u64>,
}

/// Sidecar location for a data file: `<data path>.free`
pub fn sidecar_path(data_path: &Path) -> PathBuf {
    let mut name = OsString::from(data_path.as_os_str());
    name.push(".free");
    PathBuf::from(name)
}

impl FreeSpaceIndex {
    /// Serialize to the sidecar format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = Snapshot {
            slots: self.slots(),
            relocated: self.relocated().collect(),
        };
        let body =
            bincode::serialize(&snapshot).map_err(|e| BearError::Encoding(e.to_string()))?;

        let mut bytes = Vec::with_capacity(SIDECAR_HEADER_SIZE + body.len());
        bytes.extend_from_slice(SIDECAR_MAGIC);
        bytes.extend_from_slice(&SIDECAR_VERSION.to_le_bytes());
        bytes.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Parse the sidecar format, verifying magic, version and checksum
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SIDECAR_HEADER_SIZE {
            return Err(BearError::Format(format!(
                "Free-space sidecar truncated: {} bytes",
                bytes.len()
            )));
        }
        if &bytes[0..4] != SIDECAR_MAGIC {
            return Err(BearError::Format(format!(
                "Invalid sidecar magic: expected BFRE, got {:?}",
                &bytes[0..4]
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != SIDECAR_VERSION {
            return Err(BearError::Format(format!(
                "Unsupported sidecar version: {}",
                version
            )));
        }

        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[6..10]);
        let expected_crc = u32::from_le_bytes(crc);

        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[10..18]);
        let body_len = u64::from_le_bytes(len);

        let body = &bytes[SIDECAR_HEADER_SIZE..];
        if body.len() as u64 != body_len {
            return Err(BearError::Format(format!(
                "Sidecar body is {} bytes, header says {}",
                body.len(),
                body_len
            )));
        }
        if crc32fast::hash(body) != expected_crc {
            return Err(BearError::Format("Sidecar checksum mismatch".to_string()));
        }

        let snapshot: Snapshot =
            bincode::deserialize(body).map_err(|e| BearError::Decoding(e.to_string()))?;
        if let Some((id, _)) = snapshot.slots.iter().find(|(id, _)| *id < FIRST_ID) {
            return Err(BearError::Format(format!(
                "Sidecar slot {} lies before the data region",
                id
            )));
        }

        if let Some(offset) = snapshot.relocated.iter().find(|o| **o < DATA_START) {
            return Err(BearError::Format(format!(
                "Sidecar relocated body {} lies before the data region",
                offset
            )));
        }

        let mut index = Self::from_slots(snapshot.slots);
        for offset in snapshot.relocated {
            index.mark_relocated(offset);
        }
        Ok(index)
    }

    /// Write the sidecar atomically (temp file + rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut tmp = OsString::from(path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, self.to_bytes()?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read a sidecar; `Ok(None)` if it does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
