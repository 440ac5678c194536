//! Topology persistence.
//!
//! A network is stored as an ordered list of device records:
//!
//! ```json
//! [
//!   {
//!     "type": "host",
//!     "name": "h1",
//!     "interfaces": [
//!       {
//!         "name": "eth0",
//!         "mac": "00:00:00:00:00:01",
//!         "connected_to": { "device": "sw", "interface": "eth0" }
//!       }
//!     ],
//!     "x": 10.0,
//!     "y": 20.0
//!   }
//! ]
//! ```
//!
//! Learned state (switch tables, ARP caches, queued frames) is not stored.

use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DeviceType, Network, Position};
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::format::MacAddr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub name: String,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRecord>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub name: String,
    pub mac: MacAddr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_to: Option<Endpoint>,
}

/// The far end of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub device: String,
    pub interface: String,
}

impl Network {
    /// Describe every device in registration order.
    pub fn to_records(&self) -> Vec<DeviceRecord> {
        self.devices()
            .iter()
            .map(|device| DeviceRecord {
                device_type: device.device_type(),
                name: device.name().to_string(),
                interfaces: device
                    .interfaces()
                    .iter()
                    .map(|iface| InterfaceRecord {
                        name: iface.name().to_string(),
                        mac: iface.mac(),
                        ip: iface.ipv4(),
                        connected_to: self
                            .peer(iface.id())
                            .and_then(|peer| self.interface_by_id(peer))
                            .and_then(|peer| {
                                let owner = self.device_by_id(peer.device()).ok()?;
                                Some(Endpoint {
                                    device: owner.name().to_string(),
                                    interface: peer.name().to_string(),
                                })
                            }),
                    })
                    .collect(),
                x: device.position().x,
                y: device.position().y,
            })
            .collect()
    }

    /// Rebuild a network from records.
    ///
    /// Every naming and connection rule applies as if the network were built
    /// by hand. A link may be listed on one or both of its ends.
    pub fn from_records(records: &[DeviceRecord], config: SimulationConfig) -> Result<Network> {
        let mut network = Network::with_config(config);

        for record in records {
            network.add_device_with(record.device_type, &record.name, 0)?;
            network.set_position(&record.name, Position::new(record.x, record.y))?;
            for iface in &record.interfaces {
                network.add_interface(&record.name, Some(&iface.name), Some(iface.mac))?;
                if iface.ip.is_some() {
                    network.set_ipv4(&record.name, &iface.name, iface.ip)?;
                }
            }
        }

        for record in records {
            for iface in &record.interfaces {
                let Some(endpoint) = &iface.connected_to else {
                    continue;
                };
                let a = network.interface(&record.name, &iface.name)?.id();
                let b = network.interface(&endpoint.device, &endpoint.interface)?.id();
                if network.peer(a) != Some(b) {
                    network.connect(a, b)?;
                }
            }
        }

        debug!(
            devices = network.devices().len(),
            links = network.links().count(),
            "loaded topology"
        );
        Ok(network)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_records())?)
    }

    pub fn from_json(json: &str, config: SimulationConfig) -> Result<Network> {
        let records: Vec<DeviceRecord> = serde_json::from_str(json)?;
        Self::from_records(&records, config)
    }

    /// Write the topology as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a JSON topology.
    pub fn load(path: impl AsRef<Path>, config: SimulationConfig) -> Result<Network> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, TopologyError};

    fn sample() -> Network {
        let mut network = Network::new();
        network.add_device(DeviceType::Switch, "sw").unwrap();
        network.add_device(DeviceType::Host, "h1").unwrap();
        network.add_device(DeviceType::Host, "h2").unwrap();
        network.add_link("h1", None, "sw", None).unwrap();
        network.add_link("h2", None, "sw", Some("eth3")).unwrap();
        network.set_position("sw", Position::new(100.0, 50.5)).unwrap();
        network
            .set_ipv4("h1", "eth0", Some(Ipv4Addr::new(192, 168, 0, 1)))
            .unwrap();
        network
    }

    #[test]
    fn test_records_round_trip() {
        let network = sample();
        let records = network.to_records();
        let loaded = Network::from_records(&records, SimulationConfig::default()).unwrap();
        assert_eq!(loaded.to_records(), records);
        assert_eq!(loaded.links().count(), 2);

        let sw = loaded.device("sw").unwrap();
        assert_eq!(sw.position(), Position::new(100.0, 50.5));
        assert_eq!(sw.interfaces().len(), 4);
        let h2 = loaded.interface("h2", "eth0").unwrap().id();
        let port = loaded.interface("sw", "eth3").unwrap().id();
        assert_eq!(loaded.peer(h2), Some(port));
    }

    #[test]
    fn test_json_shape() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["type"], "switch");
        assert_eq!(value[1]["interfaces"][0]["mac"], "00:00:00:00:00:05");
        assert_eq!(value[1]["interfaces"][0]["ip"], "192.168.0.1");
        assert_eq!(value[1]["interfaces"][0]["connected_to"]["device"], "sw");
        assert!(value[0]["interfaces"][1].get("connected_to").is_none());
    }

    #[test]
    fn test_one_sided_link() {
        let json = r#"[
            {"type": "host", "name": "a", "interfaces": [{"name": "eth0", "mac": "02:00:00:00:00:0a",
              "connected_to": {"device": "b", "interface": "eth0"}}], "x": 0, "y": 0},
            {"type": "host", "name": "b", "interfaces": [{"name": "eth0", "mac": "02:00:00:00:00:0b"}], "x": 0, "y": 0}
        ]"#;
        let network = Network::from_json(json, SimulationConfig::default()).unwrap();
        assert_eq!(network.links().count(), 1);
    }

    #[test]
    fn test_invalid_records_rejected() {
        let duplicate_mac = r#"[
            {"type": "hub", "name": "a", "interfaces": [
                {"name": "eth0", "mac": "02:00:00:00:00:01"},
                {"name": "eth1", "mac": "02:00:00:00:00:01"}]}
        ]"#;
        assert!(matches!(
            Network::from_json(duplicate_mac, SimulationConfig::default()),
            Err(Error::Topology(TopologyError::MacTaken { .. }))
        ));

        let dangling = r#"[
            {"type": "hub", "name": "a", "interfaces": [
                {"name": "eth0", "mac": "02:00:00:00:00:01",
                 "connected_to": {"device": "ghost", "interface": "eth0"}}]}
        ]"#;
        assert!(matches!(
            Network::from_json(dangling, SimulationConfig::default()),
            Err(Error::Topology(TopologyError::DeviceNotFound { .. }))
        ));

        assert!(matches!(
            Network::from_json("{", SimulationConfig::default()),
            Err(Error::Json(_))
        ));
    }
}
