//! Analyzed packets: one observed frame plus its dissection.

use bytes::Bytes;
use serde::{Serialize, Serializer};

use super::AnalysisTree;
use crate::format::format_hex;
use crate::network::{Direction, InterfaceId, PacketEvent};
use crate::protocol::{EthernetProtocol, LayerTable, Packet};

/// Summary strings derived while dissecting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub protocol: Option<String>,
    pub info: Option<String>,
}

/// One observed packet occurrence.
///
/// Built once from the raw bytes and never modified afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedPacket {
    id: u64,
    time: u64,
    #[serde(skip)]
    interface_id: Option<InterfaceId>,
    device: String,
    interface: String,
    direction: Direction,
    #[serde(serialize_with = "serialize_hex")]
    data: Bytes,
    #[serde(flatten)]
    pub(crate) summary: Summary,
    pub(crate) tree: AnalysisTree,
}

fn serialize_hex<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_hex(data))
}

impl AnalyzedPacket {
    /// Dissect a packet event from the simulation.
    pub fn analyze(id: u64, event: &PacketEvent, layers: &LayerTable) -> Self {
        Self::build(
            id,
            event.time,
            Some(event.interface),
            event.device_name.to_string(),
            event.interface_name.to_string(),
            event.direction,
            event.data.clone(),
            layers,
        )
    }

    /// Dissect raw Ethernet bytes observed outside any simulation.
    pub fn from_bytes(data: impl Into<Bytes>, layers: &LayerTable) -> Self {
        Self::build(
            0,
            0,
            None,
            String::new(),
            String::new(),
            Direction::Incoming,
            data.into(),
            layers,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        id: u64,
        time: u64,
        interface_id: Option<InterfaceId>,
        device: String,
        interface: String,
        direction: Direction,
        data: Bytes,
        layers: &LayerTable,
    ) -> Self {
        let tree = AnalysisTree::root(format!("Frame {id}: {} bytes", data.len()), data.len());
        let mut analyzed = Self {
            id,
            time,
            interface_id,
            device,
            interface,
            direction,
            data,
            summary: Summary::default(),
            tree,
        };
        let packet = Packet::decode(EthernetProtocol, &analyzed.data, layers);
        packet.dissect(&mut analyzed);
        analyzed
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Simulation time (ticks) at which the packet was observed.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Interface the packet was observed on, if it came from a simulation.
    pub fn interface_id(&self) -> Option<InterfaceId> {
        self.interface_id
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn source(&self) -> Option<&str> {
        self.summary.source.as_deref()
    }

    pub fn destination(&self) -> Option<&str> {
        self.summary.destination.as_deref()
    }

    pub fn protocol(&self) -> Option<&str> {
        self.summary.protocol.as_deref()
    }

    pub fn info(&self) -> Option<&str> {
        self.summary.info.as_deref()
    }

    pub fn tree(&self) -> &AnalysisTree {
        &self.tree
    }
}
