//! Network simulation.
//!
//! This module provides:
//! - [`Network`], the device registry, link table and simulation clock
//! - [`Device`] and [`Interface`], the nodes and ports of the graph
//! - Device behaviors: [`Host`], [`Hub`] and the learning [`Switch`]
//! - [`NetworkEvent`] notifications for observers
//! - JSON topology persistence
//!
//! ## Example
//!
//! ```rust
//! use netsim_core::network::{DeviceType, Network};
//!
//! let mut network = Network::new();
//! network.add_device(DeviceType::Switch, "sw").unwrap();
//! network.add_device(DeviceType::Host, "h1").unwrap();
//! network.add_link("h1", None, "sw", None).unwrap();
//!
//! let h1 = network.interface("h1", "eth0").unwrap().id();
//! let port = network.interface("sw", "eth0").unwrap().id();
//! assert_eq!(network.peer(h1), Some(port));
//! ```

mod device;
mod event;
mod host;
mod hub;
mod id;
mod interface;
mod simulation;
mod switch;
pub mod topology;

pub use device::{Device, DeviceBehavior, DeviceContext, DeviceKind, DeviceType, Position};
pub use event::{Direction, NetworkEvent, PacketEvent};
pub use host::{EchoReply, Host, ReceivedFrame, PING_IDENTIFIER};
pub use hub::Hub;
pub use id::{DeviceId, InterfaceId, NetworkId};
pub use interface::Interface;
pub use simulation::Network;
pub use switch::Switch;
pub use topology::{DeviceRecord, Endpoint, InterfaceRecord};
