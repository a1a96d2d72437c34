//! File-backed storage
//!
//! Uses positioned I/O so concurrent readers and writers never share a cursor.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::Backend;

/// A single data file accessed with pread/pwrite
pub struct FileBackend {
    file: File,
    path: PathBuf,
    /// High-water mark, kept in memory so `size()` never hits the filesystem
    size: AtomicU64,
}

impl FileBackend {
    /// Open or create the file at `path`
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            file,
            path: path.to_path_buf(),
            size: AtomicU64::new(size),
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for FileBackend {
    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<usize> {
        let written = pwrite(&self.file, buf, offset)?;
        self.size.fetch_max(offset + written as u64, Ordering::AcqRel);
        Ok(written)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        pread(&self.file, buf, offset)
    }

    fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    fn close(&self) -> io::Result<()> {
        self.file.sync_all()
    }
}

// =============================================================================
// Platform Helpers
// =============================================================================

#[cfg(unix)]
fn pwrite(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.write_at(buf, offset)
}

#[cfg(unix)]
fn pread(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn pwrite(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_write(buf, offset)
}

#[cfg(windows)]
fn pread(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}
