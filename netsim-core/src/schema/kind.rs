//! Wire kinds: how a field is laid out in bytes and how it is displayed.

use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};

use crate::format::MacAddr;
use crate::protocol::{FieldValue, Packet};

/// Computes a variable field's width from fields parsed before it.
pub type LengthFn = fn(&Packet) -> usize;

/// Binary layout of a single field.
///
/// Numeric kinds are big-endian. The `Hex*` kinds share the layout of the
/// unsigned kinds of the same width and only differ in how they display.
#[derive(Debug, Clone, Copy)]
pub enum DataKind {
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,

    /// Signed 8-bit integer (two's complement)
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,

    /// Unsigned 8-bit integer displayed as `0x..`
    Hex8,
    /// Unsigned 16-bit integer displayed as `0x....`
    Hex16,
    /// Unsigned 32-bit integer displayed as `0x........`
    Hex32,

    /// 6-byte MAC address
    Mac,
    /// 4-byte IPv4 address
    Ipv4,

    /// Opaque bytes filling the packet up to this total length.
    Padding(usize),

    /// Opaque bytes whose length depends on earlier fields.
    Bytes(LengthFn),

    /// Every byte that is left.
    Remainder,
}

impl DataKind {
    /// Human-readable type name for display.
    pub fn type_name(&self) -> &'static str {
        match self {
            DataKind::UInt8 => "u8",
            DataKind::UInt16 => "u16",
            DataKind::UInt32 => "u32",
            DataKind::Int8 => "i8",
            DataKind::Int16 => "i16",
            DataKind::Int32 => "i32",
            DataKind::Hex8 => "hex8",
            DataKind::Hex16 => "hex16",
            DataKind::Hex32 => "hex32",
            DataKind::Mac => "mac",
            DataKind::Ipv4 => "ipv4",
            DataKind::Padding(_) => "padding",
            DataKind::Bytes(_) => "bytes",
            DataKind::Remainder => "remainder",
        }
    }

    /// Size in bytes for fixed-width kinds, None for variable-width.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            DataKind::UInt8 | DataKind::Int8 | DataKind::Hex8 => Some(1),
            DataKind::UInt16 | DataKind::Int16 | DataKind::Hex16 => Some(2),
            DataKind::UInt32 | DataKind::Int32 | DataKind::Hex32 => Some(4),
            DataKind::Mac => Some(6),
            DataKind::Ipv4 => Some(4),
            DataKind::Padding(_) | DataKind::Bytes(_) | DataKind::Remainder => None,
        }
    }

    /// Whether values of this kind are stored as [`FieldValue::Bytes`].
    pub fn is_bytes(&self) -> bool {
        matches!(
            self,
            DataKind::Padding(_) | DataKind::Bytes(_) | DataKind::Remainder
        )
    }

    /// Decode exactly `self.fixed_size()` bytes, or any number of bytes for
    /// the byte kinds.
    pub fn decode(&self, bytes: &[u8]) -> Option<FieldValue> {
        let value = match self {
            DataKind::UInt8 | DataKind::Hex8 => FieldValue::UInt8(*bytes.first()?),
            DataKind::UInt16 | DataKind::Hex16 => {
                FieldValue::UInt16(u16::from_be_bytes(bytes.get(..2)?.try_into().ok()?))
            }
            DataKind::UInt32 | DataKind::Hex32 => {
                FieldValue::UInt32(u32::from_be_bytes(bytes.get(..4)?.try_into().ok()?))
            }
            DataKind::Int8 => FieldValue::Int8(*bytes.first()? as i8),
            DataKind::Int16 => {
                FieldValue::Int16(i16::from_be_bytes(bytes.get(..2)?.try_into().ok()?))
            }
            DataKind::Int32 => {
                FieldValue::Int32(i32::from_be_bytes(bytes.get(..4)?.try_into().ok()?))
            }
            DataKind::Mac => FieldValue::MacAddr(MacAddr::from_slice(bytes)?),
            DataKind::Ipv4 => {
                let octets: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
                FieldValue::Ipv4(Ipv4Addr::from(octets))
            }
            DataKind::Padding(_) | DataKind::Bytes(_) | DataKind::Remainder => {
                FieldValue::from(bytes)
            }
        };
        Some(value)
    }

    /// Append the encoding of `value`. Values of the wrong shape write nothing.
    pub fn encode(&self, value: &FieldValue, out: &mut BytesMut) {
        match (self, value) {
            (DataKind::UInt8 | DataKind::Hex8, FieldValue::UInt8(v)) => out.put_u8(*v),
            (DataKind::UInt16 | DataKind::Hex16, FieldValue::UInt16(v)) => out.put_u16(*v),
            (DataKind::UInt32 | DataKind::Hex32, FieldValue::UInt32(v)) => out.put_u32(*v),
            (DataKind::Int8, FieldValue::Int8(v)) => out.put_i8(*v),
            (DataKind::Int16, FieldValue::Int16(v)) => out.put_i16(*v),
            (DataKind::Int32, FieldValue::Int32(v)) => out.put_i32(*v),
            (DataKind::Mac, FieldValue::MacAddr(mac)) => out.put_slice(&mac.octets()),
            (DataKind::Ipv4, FieldValue::Ipv4(addr)) => out.put_slice(&addr.octets()),
            (DataKind::Bytes(_) | DataKind::Remainder | DataKind::Padding(_), FieldValue::Bytes(b)) => {
                out.put_slice(b)
            }
            _ => {}
        }
    }

    /// Convert `value` into the variant this kind stores, if it fits.
    ///
    /// Integers are converted between widths when the value is in range.
    pub fn coerce(&self, value: FieldValue) -> Option<FieldValue> {
        match self {
            DataKind::UInt8 | DataKind::Hex8 => u8::try_from(value.as_i64()?).ok().map(FieldValue::UInt8),
            DataKind::UInt16 | DataKind::Hex16 => u16::try_from(value.as_i64()?).ok().map(FieldValue::UInt16),
            DataKind::UInt32 | DataKind::Hex32 => u32::try_from(value.as_i64()?).ok().map(FieldValue::UInt32),
            DataKind::Int8 => i8::try_from(value.as_i64()?).ok().map(FieldValue::Int8),
            DataKind::Int16 => i16::try_from(value.as_i64()?).ok().map(FieldValue::Int16),
            DataKind::Int32 => i32::try_from(value.as_i64()?).ok().map(FieldValue::Int32),
            DataKind::Mac => value.as_mac().map(FieldValue::MacAddr),
            DataKind::Ipv4 => value.as_ipv4().map(FieldValue::Ipv4),
            DataKind::Padding(_) | DataKind::Bytes(_) | DataKind::Remainder => {
                value.as_bytes().cloned().map(FieldValue::Bytes)
            }
        }
    }

    /// Render a value the way this kind presents it.
    pub fn display(&self, value: &FieldValue) -> String {
        match (self, value) {
            (DataKind::Hex8, v) => v.as_u64().map(|n| format!("{n:#04x}")),
            (DataKind::Hex16, v) => v.as_u64().map(|n| format!("{n:#06x}")),
            (DataKind::Hex32, v) => v.as_u64().map(|n| format!("{n:#010x}")),
            (DataKind::Padding(_) | DataKind::Bytes(_) | DataKind::Remainder, FieldValue::Bytes(b)) => {
                Some(format!("{} ({} bytes)", value, b.len()))
            }
            _ => None,
        }
        .unwrap_or_else(|| value.to_string())
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(DataKind::UInt32.type_name(), "u32");
        assert_eq!(DataKind::Hex16.type_name(), "hex16");
        assert_eq!(DataKind::Padding(60).type_name(), "padding");
        assert_eq!(DataKind::Mac.to_string(), "mac");
    }

    #[test]
    fn test_fixed_sizes() {
        assert_eq!(DataKind::UInt32.fixed_size(), Some(4));
        assert_eq!(DataKind::Int16.fixed_size(), Some(2));
        assert_eq!(DataKind::Mac.fixed_size(), Some(6));
        assert_eq!(DataKind::Remainder.fixed_size(), None);
    }

    #[test]
    fn test_signed_decode_sign_extends() {
        assert_eq!(DataKind::Int8.decode(&[0xff]), Some(FieldValue::Int8(-1)));
        assert_eq!(DataKind::Int16.decode(&[0xff, 0xfe]), Some(FieldValue::Int16(-2)));
        assert_eq!(
            DataKind::Int32.decode(&[0x80, 0, 0, 0]),
            Some(FieldValue::Int32(i32::MIN))
        );
        assert_eq!(DataKind::UInt8.decode(&[0xff]), Some(FieldValue::UInt8(255)));
    }

    #[test]
    fn test_decode_short_input() {
        assert_eq!(DataKind::UInt32.decode(&[1, 2]), None);
        assert_eq!(DataKind::Mac.decode(&[1, 2, 3]), None);
    }

    #[test]
    fn test_encode_big_endian() {
        let mut out = BytesMut::new();
        DataKind::UInt16.encode(&FieldValue::UInt16(0x0800), &mut out);
        DataKind::Int16.encode(&FieldValue::Int16(-2), &mut out);
        DataKind::Ipv4.encode(&FieldValue::Ipv4(Ipv4Addr::new(10, 0, 0, 1)), &mut out);
        assert_eq!(&out[..], &[0x08, 0x00, 0xff, 0xfe, 10, 0, 0, 1]);
    }

    #[test]
    fn test_encode_mismatched_value_writes_nothing() {
        let mut out = BytesMut::new();
        DataKind::UInt16.encode(&FieldValue::UInt8(1), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_hex_display() {
        assert_eq!(DataKind::Hex16.display(&FieldValue::UInt16(0x0800)), "0x0800");
        assert_eq!(DataKind::Hex8.display(&FieldValue::UInt8(0x45)), "0x45");
        assert_eq!(DataKind::UInt16.display(&FieldValue::UInt16(0x0800)), "2048");
        assert_eq!(
            DataKind::Hex32.display(&FieldValue::UInt32(1)),
            "0x00000001"
        );
    }

    #[test]
    fn test_coerce_between_widths() {
        assert_eq!(DataKind::UInt8.coerce(FieldValue::UInt32(64)), Some(FieldValue::UInt8(64)));
        assert_eq!(DataKind::UInt8.coerce(FieldValue::UInt32(300)), None);
        assert_eq!(DataKind::Int8.coerce(FieldValue::UInt8(200)), None);
        assert_eq!(DataKind::Mac.coerce(FieldValue::UInt8(1)), None);
    }
}
