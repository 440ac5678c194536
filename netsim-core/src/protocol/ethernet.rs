//! Ethernet II protocol.

use bytes::Bytes;

use super::{FieldValue, Packet, Protocol};
use crate::analysis::{AnalysisTree, Summary};
use crate::format::MacAddr;
use crate::schema::{DataKind, FieldDescriptor};

/// Ethernet header length (dst + src + ethertype).
pub const HEADER_LEN: usize = 14;

/// Minimum frame length without FCS; shorter frames are padded.
pub const MIN_FRAME_LEN: usize = 60;

/// Well-known EtherType values (IEEE 802).
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
    /// IEEE 802 local experimental EtherType 1
    pub const EXPERIMENTAL: u16 = 0x88B5;
}

static FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::new("dst", DataKind::Mac).with_label("Destination"),
    FieldDescriptor::new("src", DataKind::Mac).with_label("Source"),
    FieldDescriptor::new("ethertype", DataKind::Hex16).with_label("Type"),
];

static POST_FIELDS: [FieldDescriptor; 1] =
    [FieldDescriptor::new("padding", DataKind::Padding(MIN_FRAME_LEN)).with_label("Padding")];

/// Ethernet II protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EthernetProtocol;

impl EthernetProtocol {
    /// Build a frame carrying `payload`.
    pub fn frame(dst: MacAddr, src: MacAddr, ethertype: u16, payload: Packet) -> Packet {
        let mut frame = Packet::new(EthernetProtocol);
        frame.store("dst", dst.into());
        frame.store("src", src.into());
        frame.store("ethertype", ethertype.into());
        frame.with_next(payload)
    }

    /// Build a frame carrying raw payload bytes.
    pub fn raw_frame(dst: MacAddr, src: MacAddr, ethertype: u16, payload: Bytes) -> Packet {
        let mut data = Packet::new(super::DataProtocol);
        data.store("data", FieldValue::Bytes(payload));
        Self::frame(dst, src, ethertype, data)
    }
}

fn type_name(ethertype: u16) -> Option<&'static str> {
    match ethertype {
        ethertype::IPV4 => Some("IPv4"),
        ethertype::ARP => Some("ARP"),
        ethertype::VLAN => Some("802.1Q"),
        ethertype::IPV6 => Some("IPv6"),
        _ => None,
    }
}

impl Protocol for EthernetProtocol {
    fn name(&self) -> &'static str {
        "ethernet"
    }

    fn display_name(&self) -> &'static str {
        "Ethernet II"
    }

    fn fields(&self) -> &'static [FieldDescriptor] {
        &FIELDS
    }

    fn post_fields(&self) -> &'static [FieldDescriptor] {
        &POST_FIELDS
    }

    fn dissect(&self, packet: &Packet, summary: &mut Summary) -> AnalysisTree {
        let src = packet.get_mac("src");
        let dst = packet.get_mac("dst");
        if let Some(src) = src {
            summary.source = Some(src.to_string());
        }
        if let Some(dst) = dst {
            summary.destination = Some(if dst.is_broadcast() {
                "Broadcast".to_string()
            } else {
                dst.to_string()
            });
        }

        let label = match (src, dst) {
            (Some(src), Some(dst)) => format!("Ethernet II, Src: {src}, Dst: {dst}"),
            _ => self.display_name().to_string(),
        };
        packet.field_tree(&label)
    }

    fn post_dissect(&self, packet: &Packet, _tree: &mut AnalysisTree, summary: &mut Summary) {
        // Nothing inside claimed the frame: describe it by its EtherType.
        if summary.protocol.is_none() {
            if let Some(ethertype) = packet.get_u64("ethertype") {
                let ethertype = ethertype as u16;
                summary.protocol = Some(
                    type_name(ethertype)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("0x{ethertype:04x}")),
                );
            }
        }
        if summary.info.is_none() {
            let len = packet.next().map_or(0, |next| next.serialize().len());
            summary.info = Some(format!("Ethernet II, {len} byte payload"));
        }
    }
}
