//! Packet framework.
//!
//! This module provides:
//! - [`Protocol`] trait describing a wire layout and its dissection hooks
//! - [`Packet`], one decoded layer owning the layer it encapsulates
//! - [`LayerTable`], the bindings that decide which protocol comes next
//! - Built-in protocols
//!
//! ## Supported Protocols
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet II |
//! | Network | IPv4, ARP, ICMP |
//! | Transport | TCP, UDP |
//! | Payload | Data |
//!
//! ## Example
//!
//! ```rust
//! use netsim_core::protocol::{default_layers, EthernetProtocol, Packet};
//!
//! let layers = default_layers();
//! let frame: &[u8] = &[
//!     0xff, 0xff, 0xff, 0xff, 0xff, 0xff,  // dst mac
//!     0x00, 0x00, 0x00, 0x00, 0x00, 0x01,  // src mac
//!     0x88, 0xb5,                          // ethertype (experimental)
//!     b'h', b'i',
//! ];
//!
//! let packet = Packet::decode(EthernetProtocol, frame, &layers);
//! let names: Vec<_> = packet.layers().map(Packet::name).collect();
//! assert_eq!(names, ["ethernet", "data"]);
//! assert_eq!(packet.serialize().len(), 60); // padded on the way out
//! ```

mod field;
mod layer;
mod packet;
mod registry;

// Protocol implementations
pub mod arp;
pub mod data;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;
pub mod tcp;
pub mod udp;

// Test utilities (only compiled for tests)
#[cfg(test)]
pub mod test_utils;

pub use field::FieldValue;
pub use layer::LayerTable;
pub use packet::{FieldSpan, Packet};
pub use registry::{BuiltinProtocol, Protocol};

// Re-export protocol implementations
pub use arp::ArpProtocol;
pub use data::DataProtocol;
pub use ethernet::EthernetProtocol;
pub use icmp::IcmpProtocol;
pub use ipv4::{internet_checksum, Ipv4Protocol};
pub use tcp::TcpProtocol;
pub use udp::UdpProtocol;

pub use ethernet::ethertype;
pub use icmp::icmp_type;
pub use ipv4::ip_protocol;

/// Create a layer table with every built-in protocol bound.
pub fn default_layers() -> LayerTable {
    let mut layers = LayerTable::new();

    // Layer 2
    layers.register(EthernetProtocol);
    layers.bind_field(EthernetProtocol, "ethertype", ethertype::ARP as u64, ArpProtocol);
    layers.bind_field(EthernetProtocol, "ethertype", ethertype::IPV4 as u64, Ipv4Protocol);

    // Layer 3
    layers.bind_field(Ipv4Protocol, "protocol", ip_protocol::ICMP as u64, IcmpProtocol);
    layers.bind_field(Ipv4Protocol, "protocol", ip_protocol::TCP as u64, TcpProtocol);
    layers.bind_field(Ipv4Protocol, "protocol", ip_protocol::UDP as u64, UdpProtocol);

    // Anything unclaimed becomes opaque data
    for parent in [
        BuiltinProtocol::from(EthernetProtocol),
        Ipv4Protocol.into(),
        IcmpProtocol.into(),
        TcpProtocol.into(),
        UdpProtocol.into(),
    ] {
        layers.bind_fallback(parent, DataProtocol);
    }

    layers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layers() {
        let layers = default_layers();
        assert_eq!(layers.len(), 7);
        assert_eq!(layers.children("ethernet"), vec!["arp", "ipv4", "data"]);
        assert_eq!(layers.children("ipv4"), vec!["icmp", "tcp", "udp", "data"]);
        assert!(layers.children("arp").is_empty());
        assert!(layers.children("data").is_empty());
    }

    #[test]
    fn test_arp_frame_layers() {
        let frame = test_utils::EthernetBuilder::new()
            .arp()
            .payload(vec![0; 28])
            .build();
        let packet = Packet::decode(EthernetProtocol, &frame, &default_layers());
        test_utils::assert_layers(&packet, &["ethernet", "arp"]);
        test_utils::assert_field_eq(&packet, "ethertype", &FieldValue::UInt16(0x0806));
    }
}
