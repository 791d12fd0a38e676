//! Document value encoding.
//!
//! The top byte of the document flags records the value format, the same
//! convention every SDK shares, so documents written here decode elsewhere.

use crate::{error::Result, Error};
use serde::de::DeserializeOwned;
use serde::Serialize;

const FORMAT_SHIFT: u32 = 24;
const FORMAT_MASK: u32 = 0xff << FORMAT_SHIFT;

/// Common flags value formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Binary,
    String,
    /// Flags written by a legacy client, with no format byte.
    Unknown,
}

impl Format {
    pub const fn flags(self) -> u32 {
        match self {
            Format::Json => 0x02 << FORMAT_SHIFT,
            Format::Binary => 0x03 << FORMAT_SHIFT,
            Format::String => 0x04 << FORMAT_SHIFT,
            Format::Unknown => 0,
        }
    }

    pub fn from_flags(flags: u32) -> Self {
        match (flags & FORMAT_MASK) >> FORMAT_SHIFT {
            0x02 => Format::Json,
            0x03 => Format::Binary,
            0x04 => Format::String,
            _ => Format::Unknown,
        }
    }
}

/// An encoded document value with its flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    bytes: Vec<u8>,
    format: Format,
}

impl Content {
    /// Serialize `value` as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self {
            bytes: serde_json::to_vec(value)?,
            format: Format::Json,
        })
    }

    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            format: Format::Binary,
        }
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self {
            bytes: text.into().into_bytes(),
            format: Format::String,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn flags(&self) -> u32 {
        self.format.flags()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Decode a stored value as JSON into `T`.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8], flags: u32) -> Result<T> {
    match Format::from_flags(flags) {
        Format::Json | Format::Unknown => Ok(serde_json::from_slice(bytes)?),
        Format::String => {
            // Strings decode into any target that accepts a JSON string.
            let text = std::str::from_utf8(bytes).map_err(|e| Error::Encoding(e.to_string()))?;
            Ok(serde_json::from_value(serde_json::Value::String(
                text.to_string(),
            ))?)
        }
        Format::Binary => Err(Error::Encoding(
            "binary document cannot be decoded as json".into(),
        )),
    }
}
