//! Field value types for packet instances.
//!
//! A [`FieldValue`] is the decoded form of one field. Values are owned so a
//! packet can outlive the buffer it was parsed from; byte-valued fields use
//! [`Bytes`] so cloning a parsed packet never copies payload data.

use std::net::Ipv4Addr;

use bytes::Bytes;

use crate::format::{format_hex, MacAddr};

/// Possible field value types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    // === Unsigned integers ===
    /// Unsigned 8-bit integer
    UInt8(u8),
    /// Unsigned 16-bit integer
    UInt16(u16),
    /// Unsigned 32-bit integer
    UInt32(u32),

    // === Signed integers ===
    /// Signed 8-bit integer
    Int8(i8),
    /// Signed 16-bit integer
    Int16(i16),
    /// Signed 32-bit integer
    Int32(i32),

    // === Network types ===
    /// MAC address (6 bytes)
    MacAddr(MacAddr),
    /// IPv4 address (4 bytes)
    Ipv4(Ipv4Addr),

    /// Opaque bytes (padding, options, payload).
    Bytes(Bytes),
}

impl FieldValue {
    /// Try to get as u64. Negative signed values yield `None`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::UInt8(v) => Some(*v as u64),
            FieldValue::UInt16(v) => Some(*v as u64),
            FieldValue::UInt32(v) => Some(*v as u64),
            FieldValue::Int8(_) | FieldValue::Int16(_) | FieldValue::Int32(_) => {
                self.as_i64().and_then(|v| u64::try_from(v).ok())
            }
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int8(v) => Some(*v as i64),
            FieldValue::Int16(v) => Some(*v as i64),
            FieldValue::Int32(v) => Some(*v as i64),
            FieldValue::UInt8(v) => Some(*v as i64),
            FieldValue::UInt16(v) => Some(*v as i64),
            FieldValue::UInt32(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_mac(&self) -> Option<MacAddr> {
        match self {
            FieldValue::MacAddr(mac) => Some(*mac),
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            FieldValue::Ipv4(addr) => Some(*addr),
            _ => None,
        }
    }

    /// Try to get as bytes reference.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Whether this value is one of the integer variants.
    pub fn is_integer(&self) -> bool {
        self.as_i64().is_some()
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::UInt8(v) => write!(f, "{v}"),
            FieldValue::UInt16(v) => write!(f, "{v}"),
            FieldValue::UInt32(v) => write!(f, "{v}"),
            FieldValue::Int8(v) => write!(f, "{v}"),
            FieldValue::Int16(v) => write!(f, "{v}"),
            FieldValue::Int32(v) => write!(f, "{v}"),
            FieldValue::MacAddr(mac) => write!(f, "{mac}"),
            FieldValue::Ipv4(addr) => write!(f, "{addr}"),
            FieldValue::Bytes(b) if b.is_empty() => write!(f, "[0 bytes]"),
            FieldValue::Bytes(b) => write!(f, "{}", format_hex(b)),
        }
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        FieldValue::UInt8(v)
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        FieldValue::UInt16(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::UInt32(v)
    }
}

impl From<i8> for FieldValue {
    fn from(v: i8) -> Self {
        FieldValue::Int8(v)
    }
}

impl From<i16> for FieldValue {
    fn from(v: i16) -> Self {
        FieldValue::Int16(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int32(v)
    }
}

impl From<MacAddr> for FieldValue {
    fn from(v: MacAddr) -> Self {
        FieldValue::MacAddr(v)
    }
}

impl From<Ipv4Addr> for FieldValue {
    fn from(v: Ipv4Addr) -> Self {
        FieldValue::Ipv4(v)
    }
}

impl From<Bytes> for FieldValue {
    fn from(v: Bytes) -> Self {
        FieldValue::Bytes(v)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Bytes(Bytes::from(v))
    }
}

impl From<&[u8]> for FieldValue {
    fn from(v: &[u8]) -> Self {
        FieldValue::Bytes(Bytes::copy_from_slice(v))
    }
}
