//! Simulation settings.

use serde::{Deserialize, Serialize};

use crate::network::DeviceType;

/// Tunables shared by a network and its capture export.
///
/// # Example
///
/// ```
/// use netsim_core::config::SimulationConfig;
///
/// let config = SimulationConfig::default().with_tick_micros(1_000).with_switch_interfaces(8);
/// assert_eq!(config.tick_micros, 1_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Microseconds of capture time per tick.
    pub tick_micros: u64,
    /// Longest captured prefix of a packet.
    pub snaplen: u32,
    /// Interfaces created with a new host.
    pub host_interfaces: usize,
    /// Interfaces created with a new hub.
    pub hub_interfaces: usize,
    /// Interfaces created with a new switch.
    pub switch_interfaces: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_micros: 1_000_000,
            snaplen: 65535,
            host_interfaces: 1,
            hub_interfaces: 4,
            switch_interfaces: 4,
        }
    }
}

impl SimulationConfig {
    pub fn with_tick_micros(mut self, tick_micros: u64) -> Self {
        self.tick_micros = tick_micros;
        self
    }

    pub fn with_snaplen(mut self, snaplen: u32) -> Self {
        self.snaplen = snaplen;
        self
    }

    pub fn with_host_interfaces(mut self, count: usize) -> Self {
        self.host_interfaces = count;
        self
    }

    pub fn with_hub_interfaces(mut self, count: usize) -> Self {
        self.hub_interfaces = count;
        self
    }

    pub fn with_switch_interfaces(mut self, count: usize) -> Self {
        self.switch_interfaces = count;
        self
    }

    /// Interfaces a new device of `device_type` starts with.
    pub fn default_interfaces(&self, device_type: DeviceType) -> usize {
        match device_type {
            DeviceType::Host => self.host_interfaces,
            DeviceType::Hub => self.hub_interfaces,
            DeviceType::Switch => self.switch_interfaces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.default_interfaces(DeviceType::Host), 1);
        assert_eq!(config.default_interfaces(DeviceType::Hub), 4);
        assert_eq!(config.default_interfaces(DeviceType::Switch), 4);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SimulationConfig = serde_json::from_str(r#"{"snaplen": 128}"#).unwrap();
        assert_eq!(config.snaplen, 128);
        assert_eq!(config.tick_micros, 1_000_000);
    }
}
