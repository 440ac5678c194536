//! Change and traffic notifications.
//!
//! Observers call [`Network::subscribe`](super::Network::subscribe) and read
//! a channel. Events are pushed synchronously, in emission order, while the
//! operation that caused them runs.

use std::sync::mpsc::{self, Receiver, Sender};

use bytes::Bytes;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use super::{DeviceId, InterfaceId, Position};

/// Whether a packet left or entered an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "in",
            Direction::Outgoing => "out",
        }
    }
}

/// One packet crossing an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketEvent {
    pub time: u64,
    pub device: DeviceId,
    pub interface: InterfaceId,
    pub device_name: CompactString,
    pub interface_name: CompactString,
    pub direction: Direction,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    /// Interfaces, addresses, links or learned state of a device changed.
    DeviceChanged {
        device: DeviceId,
        name: CompactString,
    },
    /// A device was moved.
    PositionChanged {
        device: DeviceId,
        position: Position,
    },
    /// A packet was sent or received.
    Packet(PacketEvent),
    /// A device was handed a received frame.
    ReceiveData {
        device: DeviceId,
        interface: InterfaceId,
        data: Bytes,
    },
}

/// Fan-out to every live subscriber.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Vec<Sender<NetworkEvent>>,
}

impl EventBus {
    pub fn subscribe(&mut self) -> Receiver<NetworkEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `event`, forgetting subscribers whose receiver is gone.
    pub fn emit(&mut self, event: NetworkEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkId;

    fn changed() -> NetworkEvent {
        NetworkEvent::DeviceChanged {
            device: DeviceId {
                network: NetworkId::next(),
                index: 0,
            },
            name: "h1".into(),
        }
    }

    #[test]
    fn test_emit_in_order() {
        let mut bus = EventBus::default();
        let rx = bus.subscribe();
        bus.emit(changed());
        bus.emit(NetworkEvent::PositionChanged {
            device: DeviceId {
                network: NetworkId::next(),
                index: 1,
            },
            position: Position::new(1.0, 2.0),
        });

        assert!(matches!(rx.try_recv(), Ok(NetworkEvent::DeviceChanged { .. })));
        assert!(matches!(rx.try_recv(), Ok(NetworkEvent::PositionChanged { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut bus = EventBus::default();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        bus.emit(changed());
        assert_eq!(bus.subscribers.len(), 1);
        assert!(kept.try_recv().is_ok());

        drop(kept);
        bus.emit(changed());
        assert!(!bus.has_subscribers());
    }

    #[test]
    fn test_direction_serde() {
        assert_eq!(serde_json::to_string(&Direction::Outgoing).unwrap(), "\"outgoing\"");
    }
}
