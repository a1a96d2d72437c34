//! Typed Store
//!
//! `Store<K, V>` puts typed keys and values on top of the byte-level
//! [`Engine`]. A record's payload is the encoded value followed by the
//! encoded key (the key is left out when `persist_keys` is off).
//!
//! Encoding runs before any lock is taken and decoding runs after the
//! payload bytes have been copied out, so the engine lock is never held
//! across user serialization code.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::backend::Backend;
use crate::config::Config;
use crate::engine::{DefragReport, Engine, Ids};
use crate::error::{BearError, Result};
use crate::serial::{encode_entry, PayloadReader, Serial};

/// Key/value record store
pub struct Store<K, V> {
    engine: Engine,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K: Serial, V: Serial> Store<K, V> {
    /// Attach to a backend
    pub fn open(backend: Arc<dyn Backend>, config: Config) -> Result<Self> {
        Ok(Self::from_engine(Engine::open(backend, config)?))
    }

    /// Open or create a file-backed store (see [`Engine::open_path`])
    pub fn open_path(path: &Path, config: Config) -> Result<Self> {
        Ok(Self::from_engine(Engine::open_path(path, config)?))
    }

    /// Wrap an already opened engine
    pub fn from_engine(engine: Engine) -> Self {
        Self {
            engine,
            _types: PhantomData,
        }
    }

    /// The underlying byte-level engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store a key/value pair, reusing free space when possible
    pub fn add_entry(&self, key: &K, value: &V) -> Result<u64> {
        let payload = encode_entry(key, value, self.engine.config().persist_keys)?;
        self.engine.insert(&payload)
    }

    /// Store a key/value pair at the end of storage
    pub fn append_entry(&self, key: &K, value: &V) -> Result<u64> {
        let payload = encode_entry(key, value, self.engine.config().persist_keys)?;
        self.engine.append(&payload)
    }

    /// Replace the value of a record, keeping its stored key
    pub fn modify(&self, id: u64, value: &V) -> Result<()> {
        let payload = self.reframe(id, value)?;
        self.engine.modify(id, &payload)
    }

    /// Replace the value of a record without letting it grow.
    ///
    /// Works on append-only stores; fails with `CapacityExceeded` when the
    /// new entry does not fit the record's slot.
    pub fn re_entry(&self, id: u64, value: &V) -> Result<()> {
        let payload = self.reframe(id, value)?;
        self.engine.rewrite(id, &payload)
    }

    /// Delete an entry; its slot becomes reusable
    pub fn delete(&self, id: u64) -> Result<()> {
        self.engine.delete(id)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Decode the value stored at `id`
    pub fn get_value(&self, id: u64) -> Result<V> {
        PayloadReader::new(self.engine.read(id)?).next_item()
    }

    /// Decode the value and the key stored at `id`
    pub fn get_key_and_value(&self, id: u64) -> Result<(K, V)> {
        if !self.engine.config().persist_keys {
            return Err(BearError::KeysNotPersisted);
        }
        let mut reader = PayloadReader::new(self.engine.read(id)?);
        let value = reader.next_item::<V>()?;
        let key = reader.next_item::<K>()?;
        Ok((key, value))
    }

    // =========================================================================
    // Iteration & Maintenance
    // =========================================================================

    /// Id of the next entry after `id`
    pub fn next(&self, id: u64) -> Result<Option<u64>> {
        self.engine.next(id)
    }

    /// Id of the first entry
    pub fn first(&self) -> Result<Option<u64>> {
        self.engine.first()
    }

    /// Iterate entry ids in storage order
    pub fn ids(&self) -> Ids<'_> {
        self.engine.ids()
    }

    /// Merge adjacent deleted entries (see [`Engine::defrag`])
    pub fn defrag(&self, begin: u64, end: u64) -> Result<DefragReport> {
        self.engine.defrag(begin, end)
    }

    /// Current end of storage in bytes
    pub fn size(&self) -> u64 {
        self.engine.size()
    }

    /// Close the store, persisting the free-space index for file stores
    pub fn close(self) -> Result<()> {
        self.engine.close()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Build `new value ++ old key bytes` for the record at `id`
    fn reframe(&self, id: u64, value: &V) -> Result<Bytes> {
        let info = self.engine.record_info(id)?;
        if info.deleted {
            return Err(BearError::RecordDeleted(id));
        }

        let mut w = BytesMut::new().writer();
        value.serialize(&mut w)?;

        if self.engine.config().persist_keys {
            let mut reader = PayloadReader::new(self.engine.read(id)?);
            reader.next_item::<V>()?;
            let key_start = reader.position();
            reader.next_item::<K>()?;
            let key_end = reader.position();
            w.get_mut()
                .extend_from_slice(&reader.payload()[key_start..key_end]);
        }

        Ok(w.into_inner().freeze())
    }
}
