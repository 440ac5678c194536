//! Packet log: turns the network's packet events into analyzed packets.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use tracing::trace;

use super::AnalyzedPacket;
use crate::network::{Network, NetworkEvent};
use crate::protocol::LayerTable;

/// Records every packet a network sends or receives.
///
/// Events are buffered in a channel until [`PacketLog::poll`] dissects
/// them, so attaching a log costs nothing during a tick.
#[derive(Debug)]
pub struct PacketLog {
    events: Receiver<NetworkEvent>,
    layers: Arc<LayerTable>,
    packets: Vec<AnalyzedPacket>,
    next_id: u64,
}

impl PacketLog {
    /// Subscribe to `network` and log its packets from now on.
    pub fn attach(network: &mut Network) -> Self {
        Self {
            events: network.subscribe(),
            layers: network.layers(),
            packets: Vec::new(),
            next_id: 1,
        }
    }

    /// Dissect every pending packet event. Returns how many were added.
    pub fn poll(&mut self) -> usize {
        let before = self.packets.len();
        while let Ok(event) = self.events.try_recv() {
            if let NetworkEvent::Packet(event) = event {
                let packet = AnalyzedPacket::analyze(self.next_id, &event, &self.layers);
                trace!(id = self.next_id, summary = ?packet.summary(), "logged packet");
                self.packets.push(packet);
                self.next_id += 1;
            }
        }
        self.packets.len() - before
    }

    /// Logged packets in observation order.
    pub fn packets(&self) -> &[AnalyzedPacket] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Forget logged packets. Sequence ids keep counting.
    pub fn clear(&mut self) {
        self.packets.clear();
    }
}
