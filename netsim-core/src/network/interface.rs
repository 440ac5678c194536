//! Network interfaces.

use std::net::Ipv4Addr;

use bytes::Bytes;
use compact_str::CompactString;

use super::{DeviceId, InterfaceId};
use crate::format::MacAddr;

/// One port of a device.
///
/// Links are kept by the owning [`Network`](super::Network), which is the
/// only place that can make or break them symmetrically.
#[derive(Debug, Clone)]
pub struct Interface {
    id: InterfaceId,
    device: DeviceId,
    name: CompactString,
    mac: MacAddr,
    ipv4: Option<Ipv4Addr>,
    queue: Vec<Bytes>,
}

impl Interface {
    pub(crate) fn new(id: InterfaceId, device: DeviceId, name: CompactString, mac: MacAddr) -> Self {
        Self {
            id,
            device,
            name,
            mac,
            ipv4: None,
            queue: Vec::new(),
        }
    }

    pub fn id(&self) -> InterfaceId {
        self.id
    }

    /// Owning device.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        self.ipv4
    }

    pub(crate) fn set_ipv4(&mut self, ipv4: Option<Ipv4Addr>) {
        self.ipv4 = ipv4;
    }

    /// Frames waiting to be received.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn enqueue(&mut self, data: Bytes) {
        self.queue.push(data);
    }

    /// Next frame to deliver. The most recently queued frame goes first.
    pub(crate) fn pop(&mut self) -> Option<Bytes> {
        self.queue.pop()
    }

    pub(crate) fn clear_queue(&mut self) {
        self.queue.clear();
    }
}
