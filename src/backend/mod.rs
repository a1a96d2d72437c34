//! Backend Module
//!
//! Positioned byte storage underneath the engine.
//!
//! ## Responsibilities
//! - Read and write at absolute offsets (no shared cursor)
//! - Grow when a write lands past the current end
//! - Report the high-water mark as `size()`
//! - Tolerate concurrent calls at disjoint offsets
//!
//! The engine never interprets what a backend is; it only relies on the
//! four operations below.

mod file;
mod memory;

use std::io;

pub use file::FileBackend;
pub use memory::MemoryBackend;

/// Positioned read/write storage shared by all engine threads
pub trait Backend: Send + Sync {
    /// Write `buf` at `offset`, extending the region if needed
    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<usize>;

    /// Read into `buf` from `offset`; returns 0 at or past the end
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Current end of data (not allocated capacity)
    fn size(&self) -> u64;

    /// Flush and release the underlying resource
    fn close(&self) -> io::Result<()>;

    /// Fill `buf` completely or fail with `UnexpectedEof`
    fn read_exact_at(&self, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read_at(offset, buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("short read at offset {}", offset),
                    ))
                }
                Ok(n) => {
                    buf = &mut buf[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Write all of `buf` or fail
    fn write_all_at(&self, mut offset: u64, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write_at(offset, buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("zero-length write at offset {}", offset),
                    ))
                }
                Ok(n) => {
                    buf = &buf[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
