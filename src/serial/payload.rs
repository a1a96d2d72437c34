//! Payload framing
//!
//! Builds payload bytes from one or more items and reads them back in order.

use std::io::Cursor;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Result;

use super::Serial;

/// Frame `value ++ key` (key omitted when keys are not persisted)
pub fn encode_entry<K: Serial, V: Serial>(key: &K, value: &V, persist_keys: bool) -> Result<Bytes> {
    let mut w = BytesMut::new().writer();
    value.serialize(&mut w)?;
    if persist_keys {
        key.serialize(&mut w)?;
    }
    Ok(w.into_inner().freeze())
}

/// Frame several items back to back.
///
/// Every item is encoded before anything is handed to the engine, so a
/// failing item means nothing gets written.
pub fn encode_items<T: Serial>(items: &[T]) -> Result<Bytes> {
    let mut w = BytesMut::new().writer();
    for item in items {
        item.serialize(&mut w)?;
    }
    Ok(w.into_inner().freeze())
}

/// Sequential decoder over one record's payload
pub struct PayloadReader {
    cursor: Cursor<Bytes>,
}

impl PayloadReader {
    pub fn new(payload: Bytes) -> Self {
        Self {
            cursor: Cursor::new(payload),
        }
    }

    /// Decode the next item. Items already read stay consumed on error.
    pub fn next_item<T: Serial>(&mut self) -> Result<T> {
        T::deserialize(&mut self.cursor)
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Bytes left (including any trailing slack)
    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    /// The whole payload
    pub fn payload(&self) -> &Bytes {
        self.cursor.get_ref()
    }
}
