//! IPv4 protocol.

use std::net::Ipv4Addr;

use super::{Packet, Protocol};
use crate::analysis::{AnalysisTree, Summary};
use crate::schema::{DataKind, FieldDescriptor};

/// Minimum header length (IHL = 5).
pub const MIN_HEADER_LEN: usize = 20;

/// Default time to live for locally originated datagrams.
pub const DEFAULT_TTL: u8 = 64;

/// IP protocol numbers.
pub mod ip_protocol {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
}

/// Options length from the IHL nibble of `version_ihl`.
fn options_len(packet: &Packet) -> usize {
    packet
        .get_u64("version_ihl")
        .map(|v| ((v & 0x0f) as usize * 4).saturating_sub(MIN_HEADER_LEN))
        .unwrap_or(0)
}

static FIELDS: [FieldDescriptor; 11] = [
    FieldDescriptor::new("version_ihl", DataKind::Hex8).with_label("Version / Header Length"),
    FieldDescriptor::new("tos", DataKind::Hex8).with_label("Differentiated Services"),
    FieldDescriptor::new("total_length", DataKind::UInt16).with_label("Total Length"),
    FieldDescriptor::new("identification", DataKind::Hex16).with_label("Identification"),
    FieldDescriptor::new("flags_fragment", DataKind::Hex16).with_label("Flags / Fragment Offset"),
    FieldDescriptor::new("ttl", DataKind::UInt8).with_label("Time to Live"),
    FieldDescriptor::new("protocol", DataKind::UInt8).with_label("Protocol"),
    FieldDescriptor::new("checksum", DataKind::Hex16).with_label("Header Checksum"),
    FieldDescriptor::new("src", DataKind::Ipv4).with_label("Source Address"),
    FieldDescriptor::new("dst", DataKind::Ipv4).with_label("Destination Address"),
    FieldDescriptor::new("options", DataKind::Bytes(options_len)).with_label("Options"),
];

/// RFC 1071 internet checksum.
///
/// # Example
///
/// ```
/// use netsim_core::protocol::internet_checksum;
///
/// // A buffer that already carries its checksum sums to zero
/// let data = [0x45, 0x00, 0x00, 0x1c, 0x00, 0x01, 0x00, 0x00, 0x40, 0x01,
///             0x66, 0xde, 0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x02];
/// assert_eq!(internet_checksum(&data), 0);
/// ```
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = data
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]) as u32,
            [hi] => u16::from_be_bytes([*hi, 0]) as u32,
            _ => 0,
        })
        .sum();
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// IPv4 protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Protocol;

impl Ipv4Protocol {
    /// Build a datagram around `payload` with length and checksum filled in.
    pub fn datagram(
        src: Ipv4Addr,
        dst: Ipv4Addr,
        protocol: u8,
        identification: u16,
        payload: Packet,
    ) -> Packet {
        let total_length = (MIN_HEADER_LEN + payload.serialize().len()).min(u16::MAX as usize) as u16;

        let mut ip = Packet::new(Ipv4Protocol);
        ip.store("version_ihl", 0x45u8.into());
        ip.store("tos", 0u8.into());
        ip.store("total_length", total_length.into());
        ip.store("identification", identification.into());
        ip.store("flags_fragment", 0u16.into());
        ip.store("ttl", DEFAULT_TTL.into());
        ip.store("protocol", protocol.into());
        ip.store("checksum", 0u16.into());
        ip.store("src", src.into());
        ip.store("dst", dst.into());
        ip.store("options", bytes::Bytes::new().into());
        fill_header_checksum(&mut ip);
        ip.with_next(payload)
    }
}

/// Recompute the header checksum over the header fields only.
pub fn fill_header_checksum(ip: &mut Packet) {
    ip.store("checksum", 0u16.into());
    let next = ip.take_next();
    let header = ip.serialize();
    ip.store("checksum", internet_checksum(&header).into());
    ip.set_next(next);
}

fn protocol_name(protocol: u8) -> Option<&'static str> {
    match protocol {
        ip_protocol::ICMP => Some("ICMP"),
        ip_protocol::TCP => Some("TCP"),
        ip_protocol::UDP => Some("UDP"),
        _ => None,
    }
}

impl Protocol for Ipv4Protocol {
    fn name(&self) -> &'static str {
        "ipv4"
    }

    fn display_name(&self) -> &'static str {
        "Internet Protocol Version 4"
    }

    fn fields(&self) -> &'static [FieldDescriptor] {
        &FIELDS
    }

    fn payload_len(&self, packet: &Packet) -> Option<usize> {
        let total = packet.get_u64("total_length")? as usize;
        Some(total.saturating_sub(packet.header_len()))
    }

    fn dissect(&self, packet: &Packet, summary: &mut Summary) -> AnalysisTree {
        let src = packet.get_ipv4("src");
        let dst = packet.get_ipv4("dst");
        if let Some(src) = src {
            summary.source = Some(src.to_string());
        }
        if let Some(dst) = dst {
            summary.destination = Some(dst.to_string());
        }
        // Inner layers override this once they know better
        summary.protocol = Some("IPv4".to_string());

        let label = match (src, dst) {
            (Some(src), Some(dst)) => format!("Internet Protocol Version 4, Src: {src}, Dst: {dst}"),
            _ => self.display_name().to_string(),
        };
        packet.field_tree(&label)
    }

    fn post_dissect(&self, packet: &Packet, _tree: &mut AnalysisTree, summary: &mut Summary) {
        if summary.info.is_none() {
            let protocol = packet.get_u64("protocol").unwrap_or(0) as u8;
            summary.info = Some(match protocol_name(protocol) {
                Some(name) => format!("{name} payload"),
                None => format!("IP protocol {protocol}"),
            });
        }
    }
}
