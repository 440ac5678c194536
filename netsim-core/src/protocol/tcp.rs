//! TCP protocol.

use super::{Packet, Protocol};
use crate::analysis::{AnalysisTree, Summary};
use crate::schema::{DataKind, FieldDescriptor};

/// Minimum header length (data offset = 5).
pub const MIN_HEADER_LEN: usize = 20;

pub mod flags {
    pub const FIN: u16 = 0x001;
    pub const SYN: u16 = 0x002;
    pub const RST: u16 = 0x004;
    pub const PSH: u16 = 0x008;
    pub const ACK: u16 = 0x010;
    pub const URG: u16 = 0x020;
    pub const ECE: u16 = 0x040;
    pub const CWR: u16 = 0x080;
}

fn options_len(packet: &Packet) -> usize {
    packet
        .get_u64("offset_flags")
        .map(|v| ((v >> 12) as usize * 4).saturating_sub(MIN_HEADER_LEN))
        .unwrap_or(0)
}

static FIELDS: [FieldDescriptor; 9] = [
    FieldDescriptor::new("src_port", DataKind::UInt16).with_label("Source Port"),
    FieldDescriptor::new("dst_port", DataKind::UInt16).with_label("Destination Port"),
    FieldDescriptor::new("seq", DataKind::UInt32).with_label("Sequence Number"),
    FieldDescriptor::new("ack", DataKind::UInt32).with_label("Acknowledgment Number"),
    FieldDescriptor::new("offset_flags", DataKind::Hex16).with_label("Header Length / Flags"),
    FieldDescriptor::new("window", DataKind::UInt16).with_label("Window"),
    FieldDescriptor::new("checksum", DataKind::Hex16).with_label("Checksum"),
    FieldDescriptor::new("urgent", DataKind::UInt16).with_label("Urgent Pointer"),
    FieldDescriptor::new("options", DataKind::Bytes(options_len)).with_label("Options"),
];

/// Flag names in Wireshark order, e.g. `SYN, ACK`.
pub fn flag_names(bits: u16) -> String {
    const NAMES: [(u16, &str); 8] = [
        (flags::CWR, "CWR"),
        (flags::ECE, "ECE"),
        (flags::URG, "URG"),
        (flags::ACK, "ACK"),
        (flags::PSH, "PSH"),
        (flags::RST, "RST"),
        (flags::SYN, "SYN"),
        (flags::FIN, "FIN"),
    ];
    NAMES
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// TCP protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TcpProtocol;

impl Protocol for TcpProtocol {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn display_name(&self) -> &'static str {
        "Transmission Control Protocol"
    }

    fn fields(&self) -> &'static [FieldDescriptor] {
        &FIELDS
    }

    fn dissect(&self, packet: &Packet, summary: &mut Summary) -> AnalysisTree {
        summary.protocol = Some("TCP".to_string());

        let src = packet.get_u64("src_port");
        let dst = packet.get_u64("dst_port");
        if let (Some(src), Some(dst), Some(bits)) = (src, dst, packet.get_u64("offset_flags")) {
            let mut info = format!("{src} → {dst} [{}]", flag_names(bits as u16 & 0x01ff));
            if let Some(seq) = packet.get_u64("seq") {
                info.push_str(&format!(" Seq={seq}"));
            }
            if bits as u16 & flags::ACK != 0 {
                if let Some(ack) = packet.get_u64("ack") {
                    info.push_str(&format!(" Ack={ack}"));
                }
            }
            if let Some(window) = packet.get_u64("window") {
                info.push_str(&format!(" Win={window}"));
            }
            summary.info = Some(info);
        }

        let label = match (src, dst) {
            (Some(src), Some(dst)) => {
                format!("Transmission Control Protocol, Src Port: {src}, Dst Port: {dst}")
            }
            _ => self.display_name().to_string(),
        };
        packet.field_tree(&label)
    }
}
