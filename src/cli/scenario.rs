//! Building and driving a network from command-line arguments.

use std::net::Ipv4Addr;

use anyhow::{Context, Result};
use bytes::Bytes;
use netsim_core::protocol::ethertype;
use netsim_core::{DeviceType, Network, PacketLog, Position, SimulationConfig};
use tracing::info;

use super::{Args, Injection};

/// Injected frames carry at least this many payload bytes, filling a
/// minimum-size Ethernet frame without padding.
pub const INJECTED_PAYLOAD_LEN: usize = 46;

/// A finished run: the network in its final state plus everything observed.
pub struct Session {
    pub network: Network,
    pub log: PacketLog,
}

/// Three hosts (`h1`..`h3`, 10.0.0.1-3) around one switch (`sw`).
pub fn demo_network(config: SimulationConfig) -> netsim_core::Result<Network> {
    let switch_ports = config.switch_interfaces.max(3);
    let mut network = Network::with_config(config);
    network.add_device_with(DeviceType::Switch, "sw", switch_ports)?;
    network.set_position("sw", Position::new(200.0, 50.0))?;

    for (n, name) in ["h1", "h2", "h3"].into_iter().enumerate() {
        network.add_device_with(DeviceType::Host, name, 1)?;
        network.set_position(name, Position::new(100.0 * n as f64 + 100.0, 200.0))?;
        network.set_ipv4(name, "eth0", Some(Ipv4Addr::new(10, 0, 0, n as u8 + 1)))?;
        network.add_link(name, None, "sw", None)?;
    }
    Ok(network)
}

/// Send a raw experimental-EtherType frame between two devices' first
/// interfaces.
pub fn inject(network: &mut Network, injection: &Injection) -> Result<()> {
    let source = network
        .device(&injection.source)?
        .interfaces()
        .first()
        .map(|iface| iface.name().to_string())
        .with_context(|| format!("Device '{}' has no interfaces", injection.source))?;
    let destination = network
        .device(&injection.destination)?
        .interfaces()
        .first()
        .map(|iface| iface.mac())
        .with_context(|| format!("Device '{}' has no interfaces", injection.destination))?;

    let mut payload = format!("{} -> {}", injection.source, injection.destination).into_bytes();
    payload.resize(payload.len().max(INJECTED_PAYLOAD_LEN), 0);

    network.send_frame(
        &injection.source,
        &source,
        destination,
        ethertype::EXPERIMENTAL,
        Bytes::from(payload),
    )?;
    Ok(())
}

/// Build the network the arguments describe, queue traffic and run the clock.
pub fn simulate(args: &Args) -> Result<Session> {
    let config = args.config();
    let mut network = if args.demo {
        demo_network(config).context("Failed to build demo network")?
    } else {
        let path = args
            .topology
            .as_ref()
            .context("Topology file required. Use --demo or --help for usage.")?;
        Network::load(path, config)
            .with_context(|| format!("Failed to load topology: {}", path.display()))?
    };

    let mut log = PacketLog::attach(&mut network);

    for injection in &args.send {
        inject(&mut network, injection).with_context(|| {
            format!(
                "Failed to send from '{}' to '{}'",
                injection.source, injection.destination
            )
        })?;
    }
    for ping in &args.ping {
        network
            .ping(&ping.source, ping.target)
            .with_context(|| format!("Failed to ping {} from '{}'", ping.target, ping.source))?;
    }

    network.start()?;
    network.run(args.ticks)?;
    let observed = log.poll();
    info!(ticks = args.ticks, packets = observed, "simulation finished");

    Ok(Session { network, log })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use netsim_core::Direction;

    #[test]
    fn test_demo_network() {
        let network = demo_network(SimulationConfig::default()).unwrap();
        assert_eq!(network.devices().len(), 4);
        assert_eq!(network.links().count(), 3);
        assert_eq!(
            network.interface("h3", "eth0").unwrap().ipv4(),
            Some(Ipv4Addr::new(10, 0, 0, 3))
        );
    }

    #[test]
    fn test_inject_pads_payload() {
        let mut network = demo_network(SimulationConfig::default()).unwrap();
        let mut log = PacketLog::attach(&mut network);
        let injection: Injection = "h1:h2".parse().unwrap();
        inject(&mut network, &injection).unwrap();
        log.poll();

        let sent = &log.packets()[0];
        assert_eq!(sent.direction(), Direction::Outgoing);
        assert_eq!(sent.data().len(), 14 + INJECTED_PAYLOAD_LEN);
        assert_eq!(&sent.data()[14..22], b"h1 -> h2");
    }

    #[test]
    fn test_inject_unknown_device() {
        let mut network = demo_network(SimulationConfig::default()).unwrap();
        let injection: Injection = "h1:nope".parse().unwrap();
        assert!(inject(&mut network, &injection).is_err());
    }

    #[test]
    fn test_simulate_demo_ping() {
        let args = Args::parse_from(["netsim", "--demo", "--ping", "h1:10.0.0.3", "--ticks", "12"]);
        let session = simulate(&args).unwrap();

        assert_eq!(session.network.time(), 12);
        let replies = session.network.host("h1").unwrap().echo_replies();
        assert_eq!(replies.len(), 1);
        assert!(session.log.packets().iter().any(|p| p.protocol() == Some("ARP")));
        assert!(session.log.packets().iter().any(|p| p.protocol() == Some("ICMP")));
    }

    #[test]
    fn test_simulate_requires_topology() {
        let args = Args::parse_from(["netsim"]);
        assert!(simulate(&args).is_err());
    }
}
