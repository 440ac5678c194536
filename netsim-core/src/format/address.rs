//! Network address types, parsing and formatting.
//!
//! Provides:
//! - [`MacAddr`], a 6-octet hardware address with colon-separated text form
//! - Parsing of MAC and IPv4 literals into typed values
//! - Formatting helpers for raw address bytes

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AddressError;

/// A 48-bit IEEE 802 MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// The all-ones broadcast address.
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    /// Build an address from the low 48 bits of `value`.
    pub fn from_u64(value: u64) -> Self {
        let b = value.to_be_bytes();
        MacAddr([b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    /// Numeric value of the address.
    pub fn to_u64(self) -> u64 {
        let o = self.0;
        u64::from_be_bytes([0, 0, o[0], o[1], o[2], o[3], o[4], o[5]])
    }

    /// Copy an address out of the first six bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let octets: [u8; 6] = bytes.get(..6)?.try_into().ok()?;
        Some(MacAddr(octets))
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Group bit set (includes broadcast).
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mac(s)
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let literal = String::deserialize(deserializer)?;
        parse_mac(&literal).map_err(serde::de::Error::custom)
    }
}

/// Parse a MAC literal such as `00:1b:44:11:3a:b7` or `00-1B-44-11-3A-B7`.
///
/// # Example
///
/// ```
/// use netsim_core::format::parse_mac;
///
/// let mac = parse_mac("aa:bb:cc:dd:ee:ff").unwrap();
/// assert_eq!(mac.octets(), [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
/// assert!(parse_mac("aa:bb:cc").is_err());
/// ```
pub fn parse_mac(literal: &str) -> Result<MacAddr, AddressError> {
    let invalid = || AddressError::InvalidMac {
        literal: literal.to_string(),
    };

    let separator = if literal.contains('-') { '-' } else { ':' };
    let mut octets = [0u8; 6];
    let mut count = 0;
    for part in literal.trim().split(separator) {
        if count == 6
            || part.is_empty()
            || part.len() > 2
            || !part.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(invalid());
        }
        octets[count] = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        count += 1;
    }
    if count != 6 {
        return Err(invalid());
    }
    Ok(MacAddr(octets))
}

/// Parse a dotted-quad IPv4 literal.
///
/// # Example
///
/// ```
/// use netsim_core::format::parse_ipv4;
///
/// assert_eq!(parse_ipv4("10.0.0.1").unwrap().octets(), [10, 0, 0, 1]);
/// assert!(parse_ipv4("10.0.0.256").is_err());
/// ```
pub fn parse_ipv4(literal: &str) -> Result<Ipv4Addr, AddressError> {
    literal
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| AddressError::InvalidIpv4 {
            literal: literal.to_string(),
        })
}

/// Format a UInt32 as an IPv4 address string in dotted-decimal notation.
///
/// # Example
///
/// ```
/// use netsim_core::format::format_ipv4;
///
/// assert_eq!(format_ipv4(0xC0A80101), "192.168.1.1");
/// assert_eq!(format_ipv4(0x0A000001), "10.0.0.1");
/// ```
pub fn format_ipv4(value: u32) -> String {
    Ipv4Addr::from(value.to_be_bytes()).to_string()
}

/// Format 6 bytes as a MAC address string in colon-separated hex format.
///
/// Returns `None` if the slice is not exactly 6 bytes.
pub fn format_mac(bytes: &[u8]) -> Option<String> {
    if bytes.len() != 6 {
        return None;
    }
    MacAddr::from_slice(bytes).map(|mac| mac.to_string())
}

/// Format bytes as lowercase hex without separators.
pub fn format_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
