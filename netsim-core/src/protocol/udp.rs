//! UDP protocol.

use super::{Packet, Protocol};
use crate::analysis::{AnalysisTree, Summary};
use crate::schema::{DataKind, FieldDescriptor};

/// UDP header length.
pub const HEADER_LEN: usize = 8;

static FIELDS: [FieldDescriptor; 4] = [
    FieldDescriptor::new("src_port", DataKind::UInt16).with_label("Source Port"),
    FieldDescriptor::new("dst_port", DataKind::UInt16).with_label("Destination Port"),
    FieldDescriptor::new("length", DataKind::UInt16).with_label("Length"),
    FieldDescriptor::new("checksum", DataKind::Hex16).with_label("Checksum"),
];

/// UDP protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UdpProtocol;

impl Protocol for UdpProtocol {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn display_name(&self) -> &'static str {
        "User Datagram Protocol"
    }

    fn fields(&self) -> &'static [FieldDescriptor] {
        &FIELDS
    }

    fn payload_len(&self, packet: &Packet) -> Option<usize> {
        let length = packet.get_u64("length")? as usize;
        Some(length.saturating_sub(HEADER_LEN))
    }

    fn dissect(&self, packet: &Packet, summary: &mut Summary) -> AnalysisTree {
        summary.protocol = Some("UDP".to_string());
        let ports = (packet.get_u64("src_port"), packet.get_u64("dst_port"));
        let label = match ports {
            (Some(src), Some(dst)) => {
                let len = self.payload_len(packet).unwrap_or(0);
                summary.info = Some(format!("{src} → {dst} Len={len}"));
                format!("User Datagram Protocol, Src Port: {src}, Dst Port: {dst}")
            }
            _ => self.display_name().to_string(),
        };
        packet.field_tree(&label)
    }
}
