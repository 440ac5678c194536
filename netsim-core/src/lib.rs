//! # netsim-core
//!
//! Discrete-event network simulation with a declarative packet codec.
//!
//! This crate provides the engine behind the `netsim` binary. It can be
//! used standalone to build topologies, drive traffic through them tick by
//! tick, dissect what crossed the wire and export it for other tools.
//!
//! ## Features
//!
//! - **Field codec**: typed big-endian fields, padding, and variable-length
//!   byte fields, each able to parse, serialize and display itself
//! - **Packet framework**: protocols as field layouts chained through an
//!   injected layer binding table
//! - **Dissection**: byte-range annotated trees and summary columns
//! - **Simulation**: hosts, hubs and learning switches joined by
//!   point-to-point links under a deterministic clock
//! - **Capture export**: byte-exact PCAPNG output
//!
//! ## Quick Start
//!
//! ```rust
//! use netsim_core::prelude::*;
//!
//! let mut network = Network::new();
//! network.add_device(DeviceType::Host, "h1").unwrap();
//! network.add_device(DeviceType::Host, "h2").unwrap();
//! network.add_link("h1", None, "h2", None).unwrap();
//!
//! let mut log = PacketLog::attach(&mut network);
//! let dst = network.interface("h2", "eth0").unwrap().mac();
//! network
//!     .send_frame("h1", "eth0", dst, ethertype::EXPERIMENTAL, vec![0u8; 46].into())
//!     .unwrap();
//!
//! network.start().unwrap();
//! network.run(2).unwrap();
//! log.poll();
//!
//! for packet in log.packets() {
//!     println!("{} {} {:?}", packet.id(), packet.device(), packet.info());
//! }
//! let capture = export_capture(&network, log.packets(), network.config()).unwrap();
//! assert_eq!(&capture[..4], &[0x0a, 0x0d, 0x0d, 0x0a]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                          netsim-core                                |
//! +---------------------------------------------------------------------+
//! |  schema/     - FieldDescriptor, DataKind (field codec)              |
//! |  protocol/   - Protocol trait, Packet, LayerTable, 7 protocols      |
//! |  analysis/   - AnalysisTree, AnalyzedPacket, PacketLog              |
//! |  network/    - Network, devices, interfaces, events, topology JSON  |
//! |  pcap/       - PCAPNG writer                                        |
//! |  format/     - MAC/IPv4 address types and formatting                |
//! |  config      - SimulationConfig                                     |
//! |  error/      - Error types                                          |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Supported Protocols
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet II |
//! | Network | IPv4, ARP, ICMP |
//! | Transport | TCP, UDP |
//! | Payload | Data |

pub mod analysis;
pub mod config;
pub mod error;
pub mod format;
pub mod network;
pub mod pcap;
pub mod prelude;
pub mod protocol;
pub mod schema;

// Re-export commonly used types at crate root for convenience
pub use analysis::{AnalysisTree, AnalyzedPacket, PacketLog, Summary};
pub use config::SimulationConfig;
pub use error::{
    AddressError, CaptureError, Error, ProtocolError, Result, SimulationError, TopologyError,
};
pub use format::{format_ipv4, format_mac, parse_ipv4, parse_mac, MacAddr};
pub use network::{
    Device, DeviceId, DeviceType, Direction, Interface, InterfaceId, Network, NetworkEvent,
    Position,
};
pub use pcap::{export_capture, CaptureWriter};
pub use protocol::{default_layers, BuiltinProtocol, FieldValue, LayerTable, Packet, Protocol};
pub use schema::{DataKind, FieldDescriptor};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
