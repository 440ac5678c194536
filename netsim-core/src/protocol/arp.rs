//! ARP protocol (Ethernet / IPv4 only).

use std::net::Ipv4Addr;

use super::ethernet::ethertype;
use super::{Packet, Protocol};
use crate::analysis::{AnalysisTree, Summary};
use crate::format::MacAddr;
use crate::schema::{DataKind, FieldDescriptor};

/// ARP operation codes.
pub mod operation {
    pub const REQUEST: u16 = 1;
    pub const REPLY: u16 = 2;
}

/// Hardware type for Ethernet.
pub const HTYPE_ETHERNET: u16 = 1;

static FIELDS: [FieldDescriptor; 9] = [
    FieldDescriptor::new("htype", DataKind::UInt16).with_label("Hardware type"),
    FieldDescriptor::new("ptype", DataKind::Hex16).with_label("Protocol type"),
    FieldDescriptor::new("hlen", DataKind::UInt8).with_label("Hardware size"),
    FieldDescriptor::new("plen", DataKind::UInt8).with_label("Protocol size"),
    FieldDescriptor::new("oper", DataKind::UInt16).with_label("Opcode"),
    FieldDescriptor::new("sha", DataKind::Mac).with_label("Sender MAC address"),
    FieldDescriptor::new("spa", DataKind::Ipv4).with_label("Sender IP address"),
    FieldDescriptor::new("tha", DataKind::Mac).with_label("Target MAC address"),
    FieldDescriptor::new("tpa", DataKind::Ipv4).with_label("Target IP address"),
];

/// ARP protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArpProtocol;

impl ArpProtocol {
    /// Build an ARP message for Ethernet/IPv4.
    pub fn message(oper: u16, sha: MacAddr, spa: Ipv4Addr, tha: MacAddr, tpa: Ipv4Addr) -> Packet {
        let mut arp = Packet::new(ArpProtocol);
        arp.store("htype", HTYPE_ETHERNET.into());
        arp.store("ptype", ethertype::IPV4.into());
        arp.store("hlen", 6u8.into());
        arp.store("plen", 4u8.into());
        arp.store("oper", oper.into());
        arp.store("sha", sha.into());
        arp.store("spa", spa.into());
        arp.store("tha", tha.into());
        arp.store("tpa", tpa.into());
        arp
    }

    /// Who has `tpa`? Tell `spa`.
    pub fn request(sha: MacAddr, spa: Ipv4Addr, tpa: Ipv4Addr) -> Packet {
        Self::message(operation::REQUEST, sha, spa, MacAddr::default(), tpa)
    }

    /// Answer `request` on behalf of `sha`.
    pub fn reply_to(request: &Packet, sha: MacAddr) -> Option<Packet> {
        Some(Self::message(
            operation::REPLY,
            sha,
            request.get_ipv4("tpa")?,
            request.get_mac("sha")?,
            request.get_ipv4("spa")?,
        ))
    }
}

impl Protocol for ArpProtocol {
    fn name(&self) -> &'static str {
        "arp"
    }

    fn display_name(&self) -> &'static str {
        "Address Resolution Protocol"
    }

    fn fields(&self) -> &'static [FieldDescriptor] {
        &FIELDS
    }

    fn dissect(&self, packet: &Packet, summary: &mut Summary) -> AnalysisTree {
        summary.protocol = Some("ARP".to_string());

        let oper = packet.get_u64("oper").map(|o| o as u16);
        let spa = packet.get_ipv4("spa");
        let tpa = packet.get_ipv4("tpa");
        let sha = packet.get_mac("sha");
        let (info, kind) = match (oper, spa, tpa, sha) {
            (Some(operation::REQUEST), Some(spa), Some(tpa), _) => {
                (Some(format!("Who has {tpa}? Tell {spa}")), "request")
            }
            (Some(operation::REPLY), Some(spa), _, Some(sha)) => {
                (Some(format!("{spa} is at {sha}")), "reply")
            }
            (Some(other), ..) => (Some(format!("Unknown ARP opcode {other}")), "unknown"),
            _ => (None, "truncated"),
        };
        if info.is_some() {
            summary.info = info;
        }

        packet.field_tree(&format!("{} ({kind})", self.display_name()))
    }
}
