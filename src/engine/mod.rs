//! Engine Module
//!
//! The mutable record engine that coordinates backend, codec and free space.
//!
//! ## Responsibilities
//! - Validate / write the file preamble on open
//! - Load, rebuild or start an empty free-space index
//! - Allocate records (reuse, split, append with margin)
//! - Grow records in place or through a single-hop redirect
//! - Tombstone, coalesce and iterate records
//! - Persist the free-space index on close
//!
//! ## Submodules
//! - `alloc`: insert / append / slot filling
//! - `redirect`: modify / rewrite and the overflow-on-grow path
//! - `compact`: delete / defrag / full rescan
//! - `scan`: next / first / ids / inspection

mod alloc;
mod compact;
mod redirect;
mod scan;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::backend::{Backend, FileBackend};
use crate::config::{Config, FreeIndexRecovery};
use crate::error::{BearError, Result};
use crate::free_space::{sidecar_path, FreeSpaceIndex};
use crate::record::{
    header_offset, Preamble, RecordHeader, DATA_START, FIRST_ID, HEADER_SIZE, POINTER_SIZE,
};
use crate::serial::{encode_items, PayloadReader, Serial};

pub use compact::DefragReport;
pub use scan::{Ids, RecordInfo, Stats};

/// The record engine
///
/// ## Concurrency Model: one reader/writer lock
///
/// `free_index` is both the free-space index and the structural lock:
/// - **Exclusive** (`write()`): append offset assignment, allocation,
///   modify / rewrite / delete / defrag / rebuild, close
/// - **Shared** (`read()`): read, next, first, record inspection, stats
///
/// Payload encoding happens before the lock is taken. The backend itself is
/// only required to handle concurrent I/O at disjoint offsets.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Positioned byte storage
    backend: Arc<dyn Backend>,

    /// Free slots, guarded by the structural lock
    free_index: RwLock<FreeSpaceIndex>,

    /// Where the free-space index is written on close (file-backed stores)
    sidecar: Option<PathBuf>,
}

impl Engine {
    /// Attach to a backend. The free-space index is rebuilt or left empty
    /// according to `config.free_index_recovery`.
    pub fn open(backend: Arc<dyn Backend>, config: Config) -> Result<Self> {
        Self::open_inner(backend, config, None, None)
    }

    /// Attach to a backend with a previously exported free-space index
    pub fn open_with_free_index(
        backend: Arc<dyn Backend>,
        config: Config,
        index: FreeSpaceIndex,
    ) -> Result<Self> {
        Self::open_inner(backend, config, Some(index), None)
    }

    /// Open or create a file-backed store.
    ///
    /// On startup:
    /// 1. Open/create the data file
    /// 2. Load `<path>.free` if present
    /// 3. Fall back to `config.free_index_recovery` if it is missing or bad
    /// 4. Once the store is open, remove the sidecar so a crash before the
    ///    next close cannot leave a stale index behind
    pub fn open_path(path: &Path, config: Config) -> Result<Self> {
        let backend = Arc::new(FileBackend::open(path)?);
        let sidecar = sidecar_path(path);

        let persisted = match FreeSpaceIndex::load(&sidecar) {
            Ok(index) => index,
            Err(e) => {
                warn!(path = %sidecar.display(), error = %e, "discarding unreadable free-space sidecar");
                None
            }
        };

        let engine = Self::open_inner(backend, config, persisted, Some(sidecar.clone()))?;
        if sidecar.exists() {
            fs::remove_file(&sidecar)?;
        }
        Ok(engine)
    }

    fn open_inner(
        backend: Arc<dyn Backend>,
        config: Config,
        persisted: Option<FreeSpaceIndex>,
        sidecar: Option<PathBuf>,
    ) -> Result<Self> {
        config.validate()?;

        let expected = Preamble {
            persist_keys: config.persist_keys,
            mutable: config.mutable,
        };
        match Preamble::read_from(backend.as_ref())? {
            None => expected.write_to(backend.as_ref())?,
            Some(found) if found != expected => {
                return Err(BearError::Config(format!(
                    "store was created with persist_keys={} mutable={}, opened with persist_keys={} mutable={}",
                    found.persist_keys, found.mutable, expected.persist_keys, expected.mutable
                )));
            }
            Some(_) => {}
        }

        let engine = Self {
            config,
            backend,
            free_index: RwLock::new(FreeSpaceIndex::new()),
            sidecar,
        };

        match persisted {
            Some(index) => {
                let size = engine.backend.size();
                let mut free = engine.free_index.write();
                for (id, capacity) in index.iter() {
                    if id + capacity as u64 <= size {
                        free.insert(id, capacity);
                    } else {
                        warn!(id, capacity, size, "dropping free slot past the end of storage");
                    }
                }
                for offset in index.relocated() {
                    if offset + HEADER_SIZE <= size {
                        free.mark_relocated(offset);
                    } else {
                        warn!(offset, size, "dropping relocated body past the end of storage");
                    }
                }
                debug!(slots = free.len(), bytes = free.total_free(), "loaded free-space index");
            }
            // Append-only stores never redirect, so there is nothing to find
            None if !engine.config.mutable => {}
            None => match engine.config.free_index_recovery {
                FreeIndexRecovery::Rescan => {
                    engine.rebuild_free_index()?;
                }
                FreeIndexRecovery::Empty => {
                    engine.rescan(false)?;
                }
            },
        }

        debug!(
            size = engine.backend.size(),
            persist_keys = engine.config.persist_keys,
            mutable = engine.config.mutable,
            margin = engine.config.margin,
            "engine opened"
        );
        Ok(engine)
    }

    /// Persist the free-space index (file-backed stores) and close the backend
    pub fn close(self) -> Result<()> {
        let free = self.free_index.write();

        if let (Some(path), true) = (&self.sidecar, self.config.mutable) {
            free.save(path)?;
            debug!(path = %path.display(), slots = free.len(), "saved free-space index");
        }
        self.backend.close()?;

        debug!(size = self.backend.size(), "engine closed");
        Ok(())
    }

    /// Current end of storage
    pub fn size(&self) -> u64 {
        let _guard = self.free_index.read();
        self.backend.size()
    }

    /// Read a record's payload, following a redirect if there is one.
    ///
    /// Deleted records still return their bytes until the slot is reused.
    pub fn read(&self, id: u64) -> Result<Bytes> {
        let _guard = self.free_index.read();

        let header = self.read_header(self.check_id(id)?)?;
        if header.redirected {
            let (target, target_header) = self.read_target(id, header)?;
            self.read_payload(target + HEADER_SIZE, target_header.length())
        } else {
            self.read_payload(id, header.length())
        }
    }

    /// Store several items framed back to back in one record
    pub fn add_items<T: Serial>(&self, items: &[T]) -> Result<u64> {
        let payload = encode_items(items)?;
        self.insert(&payload)
    }

    /// Decode `count` consecutive items from one record, stopping at the
    /// first item that fails
    pub fn get_items<T: Serial>(&self, id: u64, count: usize) -> Result<Vec<T>> {
        let mut reader = PayloadReader::new(self.read(id)?);
        (0..count).map(|_| reader.next_item()).collect()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot of the free-space index (for persistence by the caller)
    pub fn export_free_index(&self) -> FreeSpaceIndex {
        self.free_index.read().clone()
    }

    /// Free slots as (id, capacity), ordered by id
    pub fn free_slots(&self) -> Vec<(u64, u32)> {
        self.free_index.read().slots()
    }

    /// Sidecar path used on close, if any
    pub fn sidecar_path(&self) -> Option<&Path> {
        self.sidecar.as_deref()
    }

    // =========================================================================
    // Private Helpers (caller holds the lock)
    // =========================================================================

    fn require_mutable(&self, operation: &'static str) -> Result<()> {
        if self.config.mutable {
            Ok(())
        } else {
            Err(BearError::ReadOnly(operation))
        }
    }

    /// Map an id to its header offset, rejecting ids outside the data region
    fn check_id(&self, id: u64) -> Result<u64> {
        if id < FIRST_ID || id > self.backend.size() {
            return Err(BearError::InvalidId(id));
        }
        Ok(header_offset(id))
    }

    /// Like `check_id`, but also rejects relocated bodies, which are only
    /// reachable through the redirect that owns them
    fn check_owned_id(&self, free: &FreeSpaceIndex, id: u64) -> Result<u64> {
        let offset = self.check_id(id)?;
        if free.is_relocated(offset) {
            return Err(BearError::InvalidId(id));
        }
        Ok(offset)
    }

    fn read_header(&self, offset: u64) -> Result<RecordHeader> {
        if offset < DATA_START || offset + HEADER_SIZE > self.backend.size() {
            return Err(BearError::DataCorruption(format!(
                "record header at {} lies outside the data region",
                offset
            )));
        }
        let mut buf = [0u8; HEADER_SIZE as usize];
        self.backend.read_exact_at(offset, &mut buf)?;
        Ok(RecordHeader::decode(buf))
    }

    fn write_header(&self, offset: u64, header: RecordHeader) -> Result<()> {
        self.backend.write_all_at(offset, &header.encode())?;
        Ok(())
    }

    fn read_payload(&self, id: u64, length: u32) -> Result<Bytes> {
        let end = id + length as u64;
        if end > self.backend.size() {
            return Err(BearError::DataCorruption(format!(
                "record {} claims {} bytes but storage ends at {}",
                id,
                length,
                self.backend.size()
            )));
        }
        let mut buf = vec![0u8; length as usize];
        self.backend.read_exact_at(id, &mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Read the target header offset stored in a redirect record
    fn read_pointer(&self, id: u64, header: RecordHeader) -> Result<u64> {
        if (header.length() as u64) < POINTER_SIZE {
            return Err(BearError::DataCorruption(format!(
                "redirect record {} is only {} bytes long",
                id,
                header.length()
            )));
        }
        let mut buf = [0u8; POINTER_SIZE as usize];
        self.backend.read_exact_at(id, &mut buf)?;
        let target = u64::from_le_bytes(buf);

        if target < DATA_START || target + HEADER_SIZE > self.backend.size() {
            return Err(BearError::DataCorruption(format!(
                "redirect at {} points to {}, outside the data region",
                id, target
            )));
        }
        Ok(target)
    }

    /// Follow a redirect one hop; the target must be a direct record
    fn read_target(&self, id: u64, header: RecordHeader) -> Result<(u64, RecordHeader)> {
        let target = self.read_pointer(id, header)?;
        let target_header = self.read_header(target)?;
        if target_header.redirected {
            return Err(BearError::DataCorruption(format!(
                "redirect at {} points to another redirect at {}",
                id, target
            )));
        }
        Ok((target, target_header))
    }
}
