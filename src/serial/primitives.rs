//! Serial implementations for basic types

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BearError, Result};

use super::Serial;

// =============================================================================
// Stream Helpers
// =============================================================================

fn write_all(w: &mut dyn Write, bytes: &[u8]) -> Result<()> {
    w.write_all(bytes)
        .map_err(|e| BearError::Encoding(e.to_string()))
}

fn read_array<const N: usize>(r: &mut dyn Read) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)
        .map_err(|e| BearError::Decoding(e.to_string()))?;
    Ok(buf)
}

/// u32 length prefix followed by the raw bytes
fn write_prefixed(w: &mut dyn Write, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len()).map_err(|_| {
        BearError::Encoding(format!("{} bytes exceed the u32 length prefix", bytes.len()))
    })?;
    write_all(w, &len.to_le_bytes())?;
    write_all(w, bytes)
}

fn read_prefixed(r: &mut dyn Read) -> Result<Vec<u8>> {
    let len = u32::from_le_bytes(read_array(r)?) as u64;

    // Bounded read: a corrupt prefix must not trigger a huge allocation
    let mut buf = Vec::new();
    Read::take(&mut *r, len)
        .read_to_end(&mut buf)
        .map_err(|e| BearError::Decoding(e.to_string()))?;
    if buf.len() as u64 != len {
        return Err(BearError::Decoding(format!(
            "expected {} bytes, payload ends after {}",
            len,
            buf.len()
        )));
    }
    Ok(buf)
}

// =============================================================================
// Fixed-Width Types
// =============================================================================

macro_rules! fixed_width {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Serial for $ty {
                fn serialize(&self, w: &mut dyn Write) -> Result<()> {
                    write_all(w, &self.to_le_bytes())
                }

                fn deserialize(r: &mut dyn Read) -> Result<Self> {
                    Ok(<$ty>::from_le_bytes(read_array(r)?))
                }
            }
        )*
    };
}

fixed_width!(u8, i32, u32, i64, u64, f32, f64);

impl Serial for () {
    fn serialize(&self, _w: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    fn deserialize(_r: &mut dyn Read) -> Result<Self> {
        Ok(())
    }
}

impl Serial for bool {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        write_all(w, &[*self as u8])
    }

    fn deserialize(r: &mut dyn Read) -> Result<Self> {
        match read_array::<1>(r)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(BearError::Decoding(format!("invalid bool byte {:#04x}", other))),
        }
    }
}

// =============================================================================
// Length-Prefixed Types
// =============================================================================

impl Serial for Vec<u8> {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        write_prefixed(w, self)
    }

    fn deserialize(r: &mut dyn Read) -> Result<Self> {
        read_prefixed(r)
    }
}

impl Serial for String {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        write_prefixed(w, self.as_bytes())
    }

    fn deserialize(r: &mut dyn Read) -> Result<Self> {
        String::from_utf8(read_prefixed(r)?).map_err(|e| BearError::Decoding(e.to_string()))
    }
}

// =============================================================================
// Serde Types
// =============================================================================

/// Stores any serde type using bincode
///
/// ```
/// use beardb::serial::{Bincode, Serial};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Point { x: i32, y: i32 }
///
/// let mut buf = Vec::new();
/// Bincode(Point { x: 1, y: 2 }).serialize(&mut buf).unwrap();
/// let back = Bincode::<Point>::deserialize(&mut buf.as_slice()).unwrap();
/// assert_eq!(back.0, Point { x: 1, y: 2 });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bincode<T>(pub T);

impl<T> Serial for Bincode<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        bincode::serialize_into(w, &self.0).map_err(|e| BearError::Encoding(e.to_string()))
    }

    fn deserialize(r: &mut dyn Read) -> Result<Self> {
        bincode::deserialize_from(r)
            .map(Bincode)
            .map_err(|e| BearError::Decoding(e.to_string()))
    }
}
