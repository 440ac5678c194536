//! ICMP protocol.

use super::{internet_checksum, DataProtocol, Packet, Protocol};
use crate::analysis::{AnalysisTree, Summary};
use crate::schema::{DataKind, FieldDescriptor};

/// ICMP message types.
pub mod icmp_type {
    pub const ECHO_REPLY: u8 = 0;
    pub const DESTINATION_UNREACHABLE: u8 = 3;
    pub const REDIRECT: u8 = 5;
    pub const ECHO_REQUEST: u8 = 8;
    pub const TIME_EXCEEDED: u8 = 11;
}

/// ICMP header length.
pub const HEADER_LEN: usize = 8;

// The last four bytes are "rest of header"; named for the echo layout.
static FIELDS: [FieldDescriptor; 5] = [
    FieldDescriptor::new("type", DataKind::UInt8).with_label("Type"),
    FieldDescriptor::new("code", DataKind::UInt8).with_label("Code"),
    FieldDescriptor::new("checksum", DataKind::Hex16).with_label("Checksum"),
    FieldDescriptor::new("identifier", DataKind::UInt16).with_label("Identifier"),
    FieldDescriptor::new("sequence", DataKind::UInt16).with_label("Sequence Number"),
];

/// ICMP protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IcmpProtocol;

impl IcmpProtocol {
    /// Build an echo request or reply with its checksum filled in.
    pub fn echo(icmp_type: u8, identifier: u16, sequence: u16, payload: &[u8]) -> Packet {
        let mut icmp = Packet::new(IcmpProtocol);
        icmp.store("type", icmp_type.into());
        icmp.store("code", 0u8.into());
        icmp.store("checksum", 0u16.into());
        icmp.store("identifier", identifier.into());
        icmp.store("sequence", sequence.into());

        let mut icmp = icmp.with_next(DataProtocol::packet(payload));
        let checksum = internet_checksum(&icmp.serialize());
        icmp.store("checksum", checksum.into());
        icmp
    }

    /// Build the reply to an echo request, echoing its identifier, sequence
    /// and payload.
    pub fn echo_reply(request: &Packet) -> Option<Packet> {
        let payload = request
            .next()
            .and_then(|data| data.get_bytes("data"))
            .map(|b| b.to_vec())
            .unwrap_or_default();
        Some(Self::echo(
            icmp_type::ECHO_REPLY,
            request.get_u64("identifier")? as u16,
            request.get_u64("sequence")? as u16,
            &payload,
        ))
    }
}

fn type_name(icmp_type: u8) -> &'static str {
    match icmp_type {
        icmp_type::ECHO_REPLY => "Echo (ping) reply",
        icmp_type::DESTINATION_UNREACHABLE => "Destination unreachable",
        icmp_type::REDIRECT => "Redirect",
        icmp_type::ECHO_REQUEST => "Echo (ping) request",
        icmp_type::TIME_EXCEEDED => "Time-to-live exceeded",
        _ => "Unknown",
    }
}

impl Protocol for IcmpProtocol {
    fn name(&self) -> &'static str {
        "icmp"
    }

    fn display_name(&self) -> &'static str {
        "Internet Control Message Protocol"
    }

    fn fields(&self) -> &'static [FieldDescriptor] {
        &FIELDS
    }

    fn dissect(&self, packet: &Packet, summary: &mut Summary) -> AnalysisTree {
        summary.protocol = Some("ICMP".to_string());
        if let Some(icmp_type) = packet.get_u64("type") {
            let icmp_type = icmp_type as u8;
            let mut info = type_name(icmp_type).to_string();
            if matches!(icmp_type, icmp_type::ECHO_REQUEST | icmp_type::ECHO_REPLY) {
                if let (Some(id), Some(seq)) = (packet.get_u64("identifier"), packet.get_u64("sequence")) {
                    info.push_str(&format!("  id={id:#06x}, seq={seq}"));
                }
            }
            summary.info = Some(info);
        }
        packet.field_tree(self.display_name())
    }
}
