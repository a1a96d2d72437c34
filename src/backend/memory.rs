//! In-memory storage
//!
//! A growable byte buffer, optionally loaded from / saved to a file.

use std::fs;
use std::io;
use std::path::Path;

use parking_lot::RwLock;

use super::Backend;

/// Growable in-memory byte region
#[derive(Default)]
pub struct MemoryBackend {
    data: RwLock<Vec<u8>>,
}

impl MemoryBackend {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: RwLock::new(Vec::with_capacity(capacity)),
        }
    }

    /// Wrap existing bytes (e.g. a previously saved store)
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(bytes),
        }
    }

    /// Copy of the current contents
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Load a whole file into memory
    pub fn load_from(path: &Path) -> io::Result<Self> {
        Ok(Self::from_bytes(fs::read(path)?))
    }

    /// Write the current contents to a file
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.data.read().as_slice())
    }
}

impl Backend for MemoryBackend {
    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<usize> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset overflows usize"))?;
        let end = start + buf.len();

        let mut data = self.data.write();
        if end > data.len() {
            // Gaps past the old end read back as zeroes
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.read();
        let start = match usize::try_from(offset) {
            Ok(start) if start < data.len() => start,
            _ => return Ok(0),
        };
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.read().len() as u64
    }

    /// Nothing to flush; the contents stay readable through `to_bytes`
    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}
