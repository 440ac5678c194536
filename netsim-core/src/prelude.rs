//! Convenient re-exports for common usage.
//!
//! # Example
//!
//! ```rust
//! use netsim_core::prelude::*;
//!
//! let layers = default_layers();
//! let frame = EthernetProtocol::raw_frame(
//!     MacAddr::BROADCAST,
//!     MacAddr::from_u64(1),
//!     ethertype::EXPERIMENTAL,
//!     vec![1u8, 2, 3].into(),
//! );
//! let analyzed = AnalyzedPacket::from_bytes(frame.serialize(), &layers);
//! assert_eq!(analyzed.destination(), Some("Broadcast"));
//! ```

// Schema types
pub use crate::schema::{DataKind, FieldDescriptor};

// Protocol types
pub use crate::protocol::{
    default_layers, ethertype, BuiltinProtocol, EthernetProtocol, FieldValue, LayerTable, Packet,
    Protocol,
};

// Analysis types
pub use crate::analysis::{AnalysisTree, AnalyzedPacket, PacketLog};

// Simulation types
pub use crate::config::SimulationConfig;
pub use crate::format::MacAddr;
pub use crate::network::{DeviceType, Direction, Network, NetworkEvent, Position};
pub use crate::pcap::export_capture;

// Error types
pub use crate::error::{Error, Result};
