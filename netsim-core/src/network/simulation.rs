//! The network: device registry, links and the simulation clock.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use bytes::Bytes;
use compact_str::{format_compact, CompactString};
use tracing::{debug, info, trace, warn};

use super::event::EventBus;
use super::{
    Device, DeviceBehavior, DeviceContext, DeviceId, DeviceKind, DeviceType, Direction, Host,
    Interface, InterfaceId, NetworkEvent, NetworkId, PacketEvent, Position,
};
use crate::config::SimulationConfig;
use crate::error::{Result, SimulationError, TopologyError};
use crate::format::MacAddr;
use crate::protocol::{default_layers, EthernetProtocol, LayerTable};

/// A frame on the wire, delivered to `to` when the tick ends.
#[derive(Debug)]
struct Transmission {
    to: InterfaceId,
    data: Bytes,
}

/// A graph of devices joined by point-to-point links, driven by a tick.
///
/// Links are stored once as a symmetric relation, so both ends always agree.
/// Frames sent during a tick are held on the wire until the tick ends and
/// drained by their receiver on a later tick: one hop costs one tick, and a
/// frame injected between ticks is received on the second tick.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use netsim_core::format::MacAddr;
/// use netsim_core::network::{DeviceType, Network};
/// use netsim_core::protocol::ethertype;
///
/// let mut network = Network::new();
/// network.add_device(DeviceType::Host, "h1").unwrap();
/// network.add_device(DeviceType::Host, "h2").unwrap();
/// network.add_link("h1", None, "h2", None).unwrap();
///
/// let h2 = network.interface("h2", "eth0").unwrap().mac();
/// network
///     .send_frame("h1", "eth0", h2, ethertype::EXPERIMENTAL, Bytes::from(vec![7u8; 46]))
///     .unwrap();
///
/// network.start().unwrap();
/// network.run(2).unwrap();
/// assert_eq!(network.host("h2").unwrap().received()[0].payload, vec![7u8; 46]);
/// ```
#[derive(Debug)]
pub struct Network {
    id: NetworkId,
    config: SimulationConfig,
    layers: Arc<LayerTable>,
    devices: Vec<Device>,
    links: BTreeMap<InterfaceId, InterfaceId>,
    outbox: Vec<Transmission>,
    retired: BTreeMap<DeviceId, CompactString>,
    running: bool,
    time: u64,
    next_device: u32,
    next_interface: u32,
    events: EventBus,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    pub fn with_config(config: SimulationConfig) -> Self {
        Self::with_layers(config, Arc::new(default_layers()))
    }

    /// Create a network whose devices decode frames with `layers`.
    pub fn with_layers(config: SimulationConfig, layers: Arc<LayerTable>) -> Self {
        Self {
            id: NetworkId::next(),
            config,
            layers,
            devices: Vec::new(),
            links: BTreeMap::new(),
            outbox: Vec::new(),
            retired: BTreeMap::new(),
            running: false,
            time: 0,
            next_device: 0,
            next_interface: 0,
            events: EventBus::default(),
        }
    }

    pub fn id(&self) -> NetworkId {
        self.id
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn layers(&self) -> Arc<LayerTable> {
        Arc::clone(&self.layers)
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<NetworkEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Devices
    // ========================================================================

    /// Add a device with the configured default number of interfaces.
    pub fn add_device(&mut self, device_type: DeviceType, name: &str) -> Result<DeviceId> {
        let count = self.config.default_interfaces(device_type);
        self.add_device_with(device_type, name, count)
    }

    /// Add a device with `interfaces` automatically named interfaces.
    pub fn add_device_with(
        &mut self,
        device_type: DeviceType,
        name: &str,
        interfaces: usize,
    ) -> Result<DeviceId> {
        if self.devices.iter().any(|d| d.name == name) {
            return Err(TopologyError::DeviceNameTaken {
                name: name.to_string(),
            }
            .into());
        }

        let id = DeviceId {
            network: self.id,
            index: self.next_device,
        };
        self.next_device += 1;
        self.devices.push(Device::new(id, name.into(), device_type));

        let index = self.devices.len() - 1;
        for _ in 0..interfaces {
            self.push_interface(index, None, None)?;
        }
        debug!(device = name, %device_type, interfaces, "added device");
        Ok(id)
    }

    /// Detach a device, disconnecting its interfaces first.
    ///
    /// The returned device no longer belongs to any network.
    pub fn remove_device(&mut self, name: &str) -> Result<Device> {
        let index = self.device_index(name)?;
        let ids: Vec<_> = self.devices[index].interfaces.iter().map(Interface::id).collect();
        for id in ids {
            self.unlink(id);
        }

        let mut device = self.devices.remove(index);
        device.network = None;
        for iface in &mut device.interfaces {
            iface.clear_queue();
        }
        self.retired.insert(device.id, device.name.clone());
        debug!(device = name, "removed device");
        Ok(device)
    }

    /// Devices in registration order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, name: &str) -> Result<&Device> {
        Ok(&self.devices[self.device_index(name)?])
    }

    /// Look a device up by id. Removed devices fail with `DeviceRemoved`.
    pub fn device_by_id(&self, id: DeviceId) -> Result<&Device> {
        if let Some(name) = self.retired.get(&id) {
            return Err(TopologyError::DeviceRemoved {
                name: name.to_string(),
            }
            .into());
        }
        self.devices
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| {
                TopologyError::DeviceNotFound {
                    name: id.to_string(),
                }
                .into()
            })
    }

    pub fn rename_device(&mut self, name: &str, new_name: &str) -> Result<()> {
        let index = self.device_index(name)?;
        if name == new_name {
            return Ok(());
        }
        if self.devices.iter().any(|d| d.name == new_name) {
            return Err(TopologyError::DeviceNameTaken {
                name: new_name.to_string(),
            }
            .into());
        }
        self.devices[index].name = new_name.into();
        debug!(from = name, to = new_name, "renamed device");
        self.emit_changed(index);
        Ok(())
    }

    pub fn set_position(&mut self, name: &str, position: Position) -> Result<()> {
        let index = self.device_index(name)?;
        let device = &mut self.devices[index];
        device.position = position;
        let device = device.id;
        self.events.emit(NetworkEvent::PositionChanged { device, position });
        Ok(())
    }

    /// Learned stations of a switch as `(MAC, interface name)`, ordered by MAC.
    pub fn switch_table(&self, name: &str) -> Result<Vec<(MacAddr, CompactString)>> {
        let device = self.device(name)?;
        let switch = device
            .as_switch()
            .ok_or_else(|| device.wrong_type(DeviceType::Switch))?;
        Ok(switch
            .table()
            .filter_map(|(mac, port)| {
                let iface = device.interfaces.iter().find(|iface| iface.id() == port)?;
                Some((mac, CompactString::from(iface.name())))
            })
            .collect())
    }

    pub fn clear_switch_table(&mut self, name: &str) -> Result<()> {
        let index = self.device_index(name)?;
        let device = &mut self.devices[index];
        let changed = match &mut device.kind {
            DeviceKind::Switch(switch) => switch.clear_table(),
            _ => return Err(device.wrong_type(DeviceType::Switch).into()),
        };
        if changed {
            self.emit_changed(index);
        }
        Ok(())
    }

    pub fn host(&self, name: &str) -> Result<&Host> {
        let device = self.device(name)?;
        device
            .as_host()
            .ok_or_else(|| device.wrong_type(DeviceType::Host).into())
    }

    // ========================================================================
    // Interfaces
    // ========================================================================

    /// Add an interface to a device.
    ///
    /// Without a name the lowest free `ethN` is used; without a MAC the
    /// lowest address not used anywhere in the network is allocated.
    pub fn add_interface(
        &mut self,
        device: &str,
        name: Option<&str>,
        mac: Option<MacAddr>,
    ) -> Result<InterfaceId> {
        let index = self.device_index(device)?;
        let id = self.push_interface(index, name, mac)?;
        self.emit_changed(index);
        Ok(id)
    }

    /// Remove an interface, disconnecting it first.
    pub fn remove_interface(&mut self, device: &str, interface: &str) -> Result<()> {
        let index = self.device_index(device)?;
        let slot = self.devices[index].interface_slot(interface)?;
        let id = self.devices[index].interfaces[slot].id();
        self.unlink(id);

        let device = &mut self.devices[index];
        device.interfaces.remove(slot);
        device.kind.interface_removed(id);
        debug!(device = %device.name, interface, "removed interface");
        self.emit_changed(index);
        Ok(())
    }

    pub fn set_ipv4(&mut self, device: &str, interface: &str, ipv4: Option<Ipv4Addr>) -> Result<()> {
        let index = self.device_index(device)?;
        let slot = self.devices[index].interface_slot(interface)?;
        self.devices[index].interfaces[slot].set_ipv4(ipv4);
        self.emit_changed(index);
        Ok(())
    }

    pub fn interface(&self, device: &str, interface: &str) -> Result<&Interface> {
        let device = self.device(device)?;
        let slot = device.interface_slot(interface)?;
        Ok(&device.interfaces[slot])
    }

    pub fn interface_by_id(&self, id: InterfaceId) -> Option<&Interface> {
        self.locate(id)
            .map(|(index, slot)| &self.devices[index].interfaces[slot])
    }

    fn push_interface(
        &mut self,
        index: usize,
        name: Option<&str>,
        mac: Option<MacAddr>,
    ) -> std::result::Result<InterfaceId, TopologyError> {
        let device = &self.devices[index];
        let name = match name {
            Some(name) if device.interface(name).is_some() => {
                return Err(TopologyError::InterfaceNameTaken {
                    device: device.name.to_string(),
                    interface: name.to_string(),
                });
            }
            Some(name) => CompactString::from(name),
            None => free_interface_name(device),
        };
        let mac = match mac {
            Some(mac) if self.mac_in_use(mac) => {
                return Err(TopologyError::MacTaken {
                    mac: mac.to_string(),
                });
            }
            Some(mac) => mac,
            None => self.allocate_mac(),
        };

        let id = InterfaceId {
            network: self.id,
            index: self.next_interface,
        };
        self.next_interface += 1;

        let device = &mut self.devices[index];
        trace!(device = %device.name, interface = %name, %mac, "added interface");
        device.interfaces.push(Interface::new(id, device.id, name, mac));
        Ok(id)
    }

    fn mac_in_use(&self, mac: MacAddr) -> bool {
        self.all_interfaces().any(|iface| iface.mac() == mac)
    }

    fn allocate_mac(&self) -> MacAddr {
        let used: BTreeSet<u64> = self.all_interfaces().map(|iface| iface.mac().to_u64()).collect();
        let mut candidate = 1;
        while used.contains(&candidate) {
            candidate += 1;
        }
        MacAddr::from_u64(candidate)
    }

    fn all_interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.devices.iter().flat_map(|d| d.interfaces.iter())
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Link two interfaces.
    pub fn connect(&mut self, a: InterfaceId, b: InterfaceId) -> Result<()> {
        if a == b {
            let (index, slot) = self.locate_or_err(a)?;
            return Err(TopologyError::SelfConnection {
                device: self.devices[index].name.to_string(),
                interface: self.devices[index].interfaces[slot].name().to_string(),
            }
            .into());
        }
        if a.network != self.id || b.network != self.id {
            return Err(TopologyError::CrossNetwork.into());
        }

        let ends = [self.locate_or_err(a)?, self.locate_or_err(b)?];
        for (id, (index, slot)) in [a, b].into_iter().zip(ends) {
            if self.links.contains_key(&id) {
                return Err(TopologyError::AlreadyConnected {
                    device: self.devices[index].name.to_string(),
                    interface: self.devices[index].interfaces[slot].name().to_string(),
                }
                .into());
            }
        }

        self.links.insert(a, b);
        self.links.insert(b, a);
        debug!(a = %self.endpoint_name(a), b = %self.endpoint_name(b), "connected");

        let [(first, _), (second, _)] = ends;
        self.emit_changed(first);
        if second != first {
            self.emit_changed(second);
        }
        Ok(())
    }

    /// Break the link of `a`.
    pub fn disconnect(&mut self, a: InterfaceId) -> Result<()> {
        let (index, slot) = self.locate_or_err(a)?;
        if self.unlink(a).is_none() {
            return Err(TopologyError::NotConnected {
                device: self.devices[index].name.to_string(),
                interface: self.devices[index].interfaces[slot].name().to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The interface `a` is linked to.
    pub fn peer(&self, a: InterfaceId) -> Option<InterfaceId> {
        self.links.get(&a).copied()
    }

    pub fn is_connected(&self, a: InterfaceId) -> bool {
        self.links.contains_key(&a)
    }

    /// Every link once, lower id first.
    pub fn links(&self) -> impl Iterator<Item = (InterfaceId, InterfaceId)> + '_ {
        self.links
            .iter()
            .filter(|(a, b)| a < b)
            .map(|(a, b)| (*a, *b))
    }

    /// Link two devices by name.
    ///
    /// An omitted interface name picks the device's first unconnected
    /// interface.
    pub fn add_link(
        &mut self,
        device_a: &str,
        interface_a: Option<&str>,
        device_b: &str,
        interface_b: Option<&str>,
    ) -> Result<(InterfaceId, InterfaceId)> {
        let a = self.pick_interface(device_a, interface_a, None)?;
        let b = self.pick_interface(device_b, interface_b, Some(a))?;
        self.connect(a, b)?;
        Ok((a, b))
    }

    /// Remove the link between two devices.
    ///
    /// Omitted interface names match any interface of that device.
    pub fn remove_link(
        &mut self,
        device_a: &str,
        interface_a: Option<&str>,
        device_b: &str,
        interface_b: Option<&str>,
    ) -> Result<()> {
        let side_a = self.candidates(device_a, interface_a)?;
        let side_b = self.candidates(device_b, interface_b)?;
        let linked = side_a
            .iter()
            .copied()
            .find(|a| self.peer(*a).is_some_and(|peer| side_b.contains(&peer)));

        match linked {
            Some(a) => {
                self.unlink(a);
                Ok(())
            }
            None => Err(TopologyError::NotConnected {
                device: device_a.to_string(),
                interface: interface_a.unwrap_or("*").to_string(),
            }
            .into()),
        }
    }

    fn pick_interface(
        &self,
        device: &str,
        interface: Option<&str>,
        exclude: Option<InterfaceId>,
    ) -> Result<InterfaceId> {
        let device = self.device(device)?;
        match interface {
            Some(name) => Ok(device.interfaces[device.interface_slot(name)?].id()),
            None => device
                .interfaces
                .iter()
                .map(Interface::id)
                .find(|id| !self.links.contains_key(id) && Some(*id) != exclude)
                .ok_or_else(|| {
                    TopologyError::NoFreeInterface {
                        device: device.name.to_string(),
                    }
                    .into()
                }),
        }
    }

    fn candidates(&self, device: &str, interface: Option<&str>) -> Result<Vec<InterfaceId>> {
        let device = self.device(device)?;
        Ok(match interface {
            Some(name) => vec![device.interfaces[device.interface_slot(name)?].id()],
            None => device.interfaces.iter().map(Interface::id).collect(),
        })
    }

    /// Remove the link of `a` from both ends. Returns the former peer.
    fn unlink(&mut self, a: InterfaceId) -> Option<InterfaceId> {
        let b = self.links.remove(&a)?;
        self.links.remove(&b);
        debug!(a = %self.endpoint_name(a), b = %self.endpoint_name(b), "disconnected");

        let owners: BTreeSet<usize> = [a, b]
            .into_iter()
            .filter_map(|id| self.locate(id).map(|(index, _)| index))
            .collect();
        for index in owners {
            self.emit_changed(index);
        }
        Some(b)
    }

    // ========================================================================
    // Traffic
    // ========================================================================

    /// Put `data` on the wire behind `interface`.
    ///
    /// Sending from an unconnected interface does nothing.
    pub fn send(&mut self, interface: InterfaceId, data: Bytes) -> Result<()> {
        self.locate_or_err(interface)?;
        self.transmit(interface, data);
        Ok(())
    }

    /// Send an Ethernet frame from a device's interface, sourced from its MAC.
    pub fn send_frame(
        &mut self,
        device: &str,
        interface: &str,
        dst: MacAddr,
        ethertype: u16,
        payload: Bytes,
    ) -> Result<()> {
        let iface = self.interface(device, interface)?;
        let (id, src) = (iface.id(), iface.mac());
        let frame = EthernetProtocol::raw_frame(dst, src, ethertype, payload).serialize();
        self.transmit(id, frame);
        Ok(())
    }

    /// Ping `target` from a host's first addressed interface.
    pub fn ping(&mut self, device: &str, target: Ipv4Addr) -> Result<()> {
        let index = self.device_index(device)?;
        let host = &self.devices[index];
        if host.as_host().is_none() {
            return Err(host.wrong_type(DeviceType::Host).into());
        }
        let egress = host
            .interfaces
            .iter()
            .find(|iface| iface.ipv4().is_some())
            .map(Interface::id)
            .ok_or_else(|| TopologyError::NoAddress {
                device: device.to_string(),
            })?;

        debug!(device, %target, "ping");
        self.drive(index, |kind, ctx| {
            if let DeviceKind::Host(host) = kind {
                host.ping(ctx, egress, target);
            }
        });
        Ok(())
    }

    fn transmit(&mut self, from: InterfaceId, data: Bytes) {
        let Some(to) = self.peer(from) else {
            trace!(interface = %from, "not connected, frame discarded");
            return;
        };
        self.emit_packet(from, Direction::Outgoing, &data);
        trace!(from = %from, to = %to, len = data.len(), "frame on the wire");
        self.outbox.push(Transmission { to, data });
    }

    /// Run one device callback and apply what it sent and changed.
    fn drive<R>(&mut self, index: usize, f: impl FnOnce(&mut DeviceKind, &mut DeviceContext<'_>) -> R) -> R {
        let device = &mut self.devices[index];
        let mut ctx = DeviceContext::new(&device.interfaces, &self.layers, self.time);
        let result = f(&mut device.kind, &mut ctx);
        let (sends, changed) = ctx.finish();

        for (interface, data) in sends {
            self.transmit(interface, data);
        }
        if changed {
            self.emit_changed(index);
        }
        result
    }

    // ========================================================================
    // Clock
    // ========================================================================

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start the clock.
    ///
    /// Time is monotonic across stop/start: it resumes from where it
    /// stopped, and only [`reset`](Self::reset) rewinds it to zero.
    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Err(SimulationError::AlreadyRunning.into());
        }
        self.running = true;
        info!(network = %self.id, time = self.time, "simulation started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Err(SimulationError::NotRunning.into());
        }
        self.running = false;
        info!(network = %self.id, time = self.time, "simulation stopped");
        Ok(())
    }

    /// Advance time by one tick.
    ///
    /// Devices run in registration order; each of their interfaces, in
    /// creation order, hands over at most one queued frame. Frames sent
    /// during the tick reach their receiver's queue when it ends.
    pub fn tick(&mut self) -> Result<()> {
        if !self.running {
            return Err(SimulationError::NotRunning.into());
        }
        self.time += 1;
        trace!(time = self.time, "tick");

        for index in 0..self.devices.len() {
            for slot in 0..self.devices[index].interfaces.len() {
                let iface = &mut self.devices[index].interfaces[slot];
                let Some(data) = iface.pop() else {
                    continue;
                };
                let (device, interface) = (iface.device(), iface.id());

                self.emit_packet(interface, Direction::Incoming, &data);
                self.events.emit(NetworkEvent::ReceiveData {
                    device,
                    interface,
                    data: data.clone(),
                });
                self.drive(index, |kind, ctx| kind.receive(ctx, interface, &data));
            }
        }

        self.deliver();
        Ok(())
    }

    /// Tick `ticks` times.
    pub fn run(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    /// Stop, rewind to time zero and forget all queued frames and learned
    /// state. Topology is kept.
    pub fn reset(&mut self) {
        self.running = false;
        self.time = 0;
        self.outbox.clear();
        for device in &mut self.devices {
            for iface in &mut device.interfaces {
                iface.clear_queue();
            }
            device.kind.reset();
        }
        for index in 0..self.devices.len() {
            self.emit_changed(index);
        }
        info!(network = %self.id, "simulation reset");
    }

    /// Reset and remove every device.
    pub fn clear(&mut self) {
        self.reset();
        self.links.clear();
        for mut device in self.devices.drain(..) {
            device.network = None;
            self.retired.insert(device.id, device.name);
        }
        info!(network = %self.id, "network cleared");
    }

    fn deliver(&mut self) {
        for Transmission { to, data } in std::mem::take(&mut self.outbox) {
            match self.locate(to) {
                Some((index, slot)) => self.devices[index].interfaces[slot].enqueue(data),
                None => warn!(interface = %to, len = data.len(), "receiver is gone, frame dropped"),
            }
        }
    }

    // ========================================================================
    // Lookup and notification helpers
    // ========================================================================

    fn device_index(&self, name: &str) -> std::result::Result<usize, TopologyError> {
        self.devices
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| TopologyError::DeviceNotFound {
                name: name.to_string(),
            })
    }

    fn locate(&self, id: InterfaceId) -> Option<(usize, usize)> {
        if id.network != self.id {
            return None;
        }
        self.devices.iter().enumerate().find_map(|(index, device)| {
            device
                .interfaces
                .iter()
                .position(|iface| iface.id() == id)
                .map(|slot| (index, slot))
        })
    }

    fn locate_or_err(&self, id: InterfaceId) -> std::result::Result<(usize, usize), TopologyError> {
        self.locate(id).ok_or_else(|| TopologyError::UnknownInterfaceId { id: id.to_string() })
    }

    fn endpoint_name(&self, id: InterfaceId) -> String {
        match self.locate(id) {
            Some((index, slot)) => {
                let device = &self.devices[index];
                format!("{}:{}", device.name, device.interfaces[slot].name())
            }
            None => id.to_string(),
        }
    }

    fn emit_changed(&mut self, index: usize) {
        let device = &self.devices[index];
        let event = NetworkEvent::DeviceChanged {
            device: device.id,
            name: device.name.clone(),
        };
        self.events.emit(event);
    }

    fn emit_packet(&mut self, interface: InterfaceId, direction: Direction, data: &Bytes) {
        if !self.events.has_subscribers() {
            return;
        }
        let Some((index, slot)) = self.locate(interface) else {
            return;
        };
        let device = &self.devices[index];
        let event = PacketEvent {
            time: self.time,
            device: device.id,
            interface,
            device_name: device.name.clone(),
            interface_name: device.interfaces[slot].name().into(),
            direction,
            data: data.clone(),
        };
        self.events.emit(NetworkEvent::Packet(event));
    }
}

fn free_interface_name(device: &Device) -> CompactString {
    let mut n = 0;
    loop {
        let candidate = format_compact!("eth{n}");
        if device.interface(&candidate).is_none() {
            return candidate;
        }
        n += 1;
    }
}
