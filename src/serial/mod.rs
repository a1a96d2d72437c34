//! Serialization Module
//!
//! Turns application values into payload bytes and back.
//!
//! The engine treats payloads as opaque; anything implementing [`Serial`]
//! can be stored. Encodings must be self-delimiting, because a payload may
//! carry trailing slack and several items can be framed back to back
//! (`value ++ key`, or a batch written with `add_items`).
//!
//! ## Provided Encodings
//! - `()`: writes nothing (key placeholder when keys are not stored)
//! - `bool`, `u8`: 1 byte
//! - `i32`, `u32`, `f32`: 4 bytes LE
//! - `i64`, `u64`, `f64`: 8 bytes LE
//! - `String`, `Vec<u8>`: u32 LE length prefix + bytes
//! - [`Bincode<T>`]: any serde type via bincode

mod payload;
mod primitives;

use std::io::{Read, Write};

use crate::error::Result;

pub use payload::{encode_entry, encode_items, PayloadReader};
pub use primitives::Bincode;

/// A value that can be written to and read from a byte stream
pub trait Serial: Sized {
    /// Write the encoded form of `self`
    fn serialize(&self, w: &mut dyn Write) -> Result<()>;

    /// Read exactly one encoded value
    fn deserialize(r: &mut dyn Read) -> Result<Self>;
}
