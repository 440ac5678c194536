//! Devices and the dispatch over their behaviors.

use std::fmt;

use bytes::Bytes;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use super::{DeviceId, Host, Hub, Interface, InterfaceId, NetworkId, Switch};
use crate::error::TopologyError;
use crate::protocol::LayerTable;

/// Canvas position of a device.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The kinds of device a network can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Host,
    Hub,
    Switch,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Host => "host",
            DeviceType::Hub => "hub",
            DeviceType::Switch => "switch",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a device does with the frames it receives.
pub trait DeviceBehavior {
    fn device_type(&self) -> DeviceType;

    /// Handle one frame that arrived on `ingress`.
    fn receive(&mut self, ctx: &mut DeviceContext<'_>, ingress: InterfaceId, data: &Bytes);

    /// Forget everything learned since creation.
    fn reset(&mut self);

    /// Drop state that refers to a removed interface.
    fn interface_removed(&mut self, _interface: InterfaceId) {}
}

/// Behavior state of a device.
#[derive(Debug, Clone)]
pub enum DeviceKind {
    Host(Host),
    Hub(Hub),
    Switch(Switch),
}

macro_rules! delegate_device {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            DeviceKind::Host(d) => d.$method($($arg),*),
            DeviceKind::Hub(d) => d.$method($($arg),*),
            DeviceKind::Switch(d) => d.$method($($arg),*),
        }
    };
}

impl DeviceKind {
    pub fn new(device_type: DeviceType) -> Self {
        match device_type {
            DeviceType::Host => DeviceKind::Host(Host::default()),
            DeviceType::Hub => DeviceKind::Hub(Hub),
            DeviceType::Switch => DeviceKind::Switch(Switch::default()),
        }
    }
}

impl DeviceBehavior for DeviceKind {
    #[inline]
    fn device_type(&self) -> DeviceType {
        delegate_device!(self, device_type)
    }

    #[inline]
    fn receive(&mut self, ctx: &mut DeviceContext<'_>, ingress: InterfaceId, data: &Bytes) {
        delegate_device!(self, receive, ctx, ingress, data)
    }

    #[inline]
    fn reset(&mut self) {
        delegate_device!(self, reset)
    }

    #[inline]
    fn interface_removed(&mut self, interface: InterfaceId) {
        delegate_device!(self, interface_removed, interface)
    }
}

/// What a device may touch while it handles a frame.
///
/// Frames it sends are collected and handed to the network once the device
/// returns.
pub struct DeviceContext<'a> {
    interfaces: &'a [Interface],
    layers: &'a LayerTable,
    time: u64,
    sends: Vec<(InterfaceId, Bytes)>,
    changed: bool,
}

impl<'a> DeviceContext<'a> {
    pub(crate) fn new(interfaces: &'a [Interface], layers: &'a LayerTable, time: u64) -> Self {
        Self {
            interfaces,
            layers,
            time,
            sends: Vec::new(),
            changed: false,
        }
    }

    pub fn interfaces(&self) -> &'a [Interface] {
        self.interfaces
    }

    pub fn interface(&self, id: InterfaceId) -> Option<&'a Interface> {
        self.interfaces.iter().find(|iface| iface.id() == id)
    }

    pub fn layers(&self) -> &'a LayerTable {
        self.layers
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    /// Send `data` out of `interface`.
    pub fn send(&mut self, interface: InterfaceId, data: Bytes) {
        self.sends.push((interface, data));
    }

    /// Send `data` out of every interface except `except`.
    pub fn flood(&mut self, except: InterfaceId, data: &Bytes) {
        for iface in self.interfaces {
            if iface.id() != except {
                self.sends.push((iface.id(), data.clone()));
            }
        }
    }

    /// Report a change observers should hear about.
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub(crate) fn finish(self) -> (Vec<(InterfaceId, Bytes)>, bool) {
        (self.sends, self.changed)
    }
}

/// A named node of the network owning its interfaces.
#[derive(Debug, Clone)]
pub struct Device {
    pub(crate) id: DeviceId,
    pub(crate) name: CompactString,
    pub(crate) network: Option<NetworkId>,
    pub(crate) position: Position,
    pub(crate) interfaces: Vec<Interface>,
    pub(crate) kind: DeviceKind,
}

impl Device {
    pub(crate) fn new(id: DeviceId, name: CompactString, device_type: DeviceType) -> Self {
        Self {
            id,
            name,
            network: Some(id.network),
            position: Position::default(),
            interfaces: Vec::new(),
            kind: DeviceKind::new(device_type),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> DeviceType {
        self.kind.device_type()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// The network holding this device. Fails once the device was removed.
    pub fn network(&self) -> Result<NetworkId, TopologyError> {
        self.network.ok_or_else(|| TopologyError::DeviceRemoved {
            name: self.name.to_string(),
        })
    }

    /// Interfaces in creation order.
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|iface| iface.name() == name)
    }

    pub fn kind(&self) -> &DeviceKind {
        &self.kind
    }

    pub fn as_host(&self) -> Option<&Host> {
        match &self.kind {
            DeviceKind::Host(host) => Some(host),
            _ => None,
        }
    }

    pub fn as_switch(&self) -> Option<&Switch> {
        match &self.kind {
            DeviceKind::Switch(switch) => Some(switch),
            _ => None,
        }
    }

    pub(crate) fn interface_slot(&self, name: &str) -> Result<usize, TopologyError> {
        self.interfaces
            .iter()
            .position(|iface| iface.name() == name)
            .ok_or_else(|| TopologyError::InterfaceNotFound {
                device: self.name.to_string(),
                interface: name.to_string(),
            })
    }

    pub(crate) fn wrong_type(&self, expected: DeviceType) -> TopologyError {
        TopologyError::WrongDeviceType {
            device: self.name.to_string(),
            expected: expected.as_str(),
            actual: self.device_type().as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_serde() {
        assert_eq!(serde_json::to_string(&DeviceType::Switch).unwrap(), "\"switch\"");
        let parsed: DeviceType = serde_json::from_str("\"hub\"").unwrap();
        assert_eq!(parsed, DeviceType::Hub);
    }

    #[test]
    fn test_kind_reports_type() {
        for device_type in [DeviceType::Host, DeviceType::Hub, DeviceType::Switch] {
            assert_eq!(DeviceKind::new(device_type).device_type(), device_type);
        }
    }

    #[test]
    fn test_flood_skips_ingress() {
        let network = NetworkId::next();
        let device = DeviceId { network, index: 0 };
        let interfaces: Vec<_> = (0..3)
            .map(|i| {
                Interface::new(
                    InterfaceId { network, index: i },
                    device,
                    format!("eth{i}").into(),
                    crate::format::MacAddr::from_u64(i as u64 + 1),
                )
            })
            .collect();
        let layers = LayerTable::new();
        let mut ctx = DeviceContext::new(&interfaces, &layers, 0);
        ctx.flood(interfaces[1].id(), &Bytes::from_static(b"x"));

        let (sends, changed) = ctx.finish();
        let targets: Vec<_> = sends.iter().map(|(id, _)| *id).collect();
        assert_eq!(targets, vec![interfaces[0].id(), interfaces[2].id()]);
        assert!(!changed);
    }
}
