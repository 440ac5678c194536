//! Learning switch.

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::trace;

use super::{DeviceBehavior, DeviceContext, DeviceType, Hub, InterfaceId};
use crate::format::MacAddr;
use crate::protocol::{EthernetProtocol, Packet};

/// A hub that learns which port each station sits behind.
///
/// Unicast frames to a known station leave through that station's port
/// only. Unknown, broadcast and multicast destinations are flooded.
#[derive(Debug, Clone, Default)]
pub struct Switch {
    hub: Hub,
    table: BTreeMap<MacAddr, InterfaceId>,
}

impl Switch {
    /// Learned stations, ordered by MAC address.
    pub fn table(&self) -> impl Iterator<Item = (MacAddr, InterfaceId)> + '_ {
        self.table.iter().map(|(mac, iface)| (*mac, *iface))
    }

    pub fn lookup(&self, mac: &MacAddr) -> Option<InterfaceId> {
        self.table.get(mac).copied()
    }

    /// Forget every station. Returns whether anything was forgotten.
    pub fn clear_table(&mut self) -> bool {
        let changed = !self.table.is_empty();
        self.table.clear();
        changed
    }

    fn learn(&mut self, mac: MacAddr, ingress: InterfaceId) -> bool {
        if mac.is_multicast() {
            return false;
        }
        self.table.insert(mac, ingress) != Some(ingress)
    }
}

impl DeviceBehavior for Switch {
    fn device_type(&self) -> DeviceType {
        DeviceType::Switch
    }

    fn receive(&mut self, ctx: &mut DeviceContext<'_>, ingress: InterfaceId, data: &Bytes) {
        let header = Packet::decode_header(EthernetProtocol, data);
        if header.header_truncated() {
            trace!(len = data.len(), "switch dropping runt frame");
            return;
        }
        let (Some(src), Some(dst)) = (header.get_mac("src"), header.get_mac("dst")) else {
            return;
        };

        if self.learn(src, ingress) {
            trace!(%src, port = %ingress, "learned station");
            ctx.mark_changed();
        }

        if !dst.is_multicast() {
            if let Some(egress) = self.lookup(&dst) {
                if egress == ingress {
                    trace!(%dst, "destination sits behind ingress port, dropping");
                } else {
                    ctx.send(egress, data.clone());
                }
                return;
            }
        }
        self.hub.receive(ctx, ingress, data);
    }

    fn reset(&mut self) {
        self.table.clear();
    }

    fn interface_removed(&mut self, interface: InterfaceId) {
        self.table.retain(|_, port| *port != interface);
    }
}
