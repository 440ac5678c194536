//! End-to-end tests for netsim-core.
//!
//! Drives whole networks through the public API and checks the frames they
//! put on the wire against an independent parser.

use std::net::Ipv4Addr;

use bytes::Bytes;
use etherparse::{EtherType, Ethernet2HeaderSlice, IpNumber, Ipv4HeaderSlice};
use netsim_core::protocol::{ethertype, internet_checksum};
use netsim_core::{
    export_capture, AnalyzedPacket, DeviceType, Direction, Network, NetworkEvent, PacketLog,
    SimulationConfig,
};

const SHB: u32 = 0x0A0D_0D0A;
const IDB: u32 = 0x0000_0001;
const EPB: u32 = 0x0000_0006;

/// `a` and `b` behind a hub that hangs off one switch port, `c` on another.
fn hub_behind_switch() -> Network {
    let mut network = Network::new();
    network.add_device(DeviceType::Switch, "sw").unwrap();
    network.add_device(DeviceType::Hub, "hub").unwrap();
    for (n, host) in ["a", "b", "c"].into_iter().enumerate() {
        network.add_device(DeviceType::Host, host).unwrap();
        network
            .set_ipv4(host, "eth0", Some(Ipv4Addr::new(10, 0, 0, n as u8 + 1)))
            .unwrap();
    }
    network.add_link("a", None, "hub", None).unwrap();
    network.add_link("b", None, "hub", None).unwrap();
    network.add_link("hub", None, "sw", None).unwrap();
    network.add_link("c", None, "sw", None).unwrap();
    network
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn incoming_at<'a>(packets: &'a [AnalyzedPacket], device: &str) -> Vec<&'a AnalyzedPacket> {
    packets
        .iter()
        .filter(|p| p.device() == device && p.direction() == Direction::Incoming)
        .collect()
}

#[test]
fn test_host_to_host_frame_is_delivered_on_second_tick() {
    let mut network = Network::new();
    network.add_device(DeviceType::Host, "h1").unwrap();
    network.add_device(DeviceType::Host, "h2").unwrap();
    network.add_link("h1", Some("eth0"), "h2", Some("eth0")).unwrap();

    let dst = network.interface("h2", "eth0").unwrap().mac();
    let payload = Bytes::from((0u8..46).collect::<Vec<_>>());
    network
        .send_frame("h1", "eth0", dst, ethertype::EXPERIMENTAL, payload.clone())
        .unwrap();
    let events = network.subscribe();

    network.start().unwrap();
    network.tick().unwrap();
    assert!(network.host("h2").unwrap().received().is_empty());
    network.tick().unwrap();

    let h2 = network.device("h2").unwrap().id();
    let h2_eth0 = network.interface("h2", "eth0").unwrap().id();
    let events: Vec<_> = events
        .try_iter()
        .filter(|event| !matches!(event, NetworkEvent::DeviceChanged { .. }))
        .collect();
    assert_eq!(events.len(), 2);
    let NetworkEvent::Packet(incoming) = &events[0] else {
        panic!("expected packet event, got {:?}", events[0]);
    };
    assert_eq!(incoming.direction, Direction::Incoming);
    assert_eq!(incoming.interface, h2_eth0);
    assert_eq!(incoming.time, 2);
    match &events[1] {
        NetworkEvent::ReceiveData { device, interface, data } => {
            assert_eq!(*device, h2);
            assert_eq!(*interface, h2_eth0);
            assert_eq!(data, &incoming.data);
            assert_eq!(&data[14..], &payload[..]);
        }
        other => panic!("expected receive data, got {other:?}"),
    }

    let received = network.host("h2").unwrap().received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].source, network.interface("h1", "eth0").unwrap().mac());
    assert_eq!(received[0].ethertype, ethertype::EXPERIMENTAL);
    assert_eq!(received[0].payload, payload);
}

#[test]
fn test_ping_frames_parse_with_independent_parser() {
    let mut network = hub_behind_switch();
    let mut log = PacketLog::attach(&mut network);
    network.ping("a", Ipv4Addr::new(10, 0, 0, 3)).unwrap();
    network.start().unwrap();
    network.run(20).unwrap();
    log.poll();

    assert_eq!(network.host("a").unwrap().echo_replies().len(), 1);

    let icmp: Vec<_> = log
        .packets()
        .iter()
        .filter(|p| p.protocol() == Some("ICMP"))
        .collect();
    assert!(!icmp.is_empty());

    for packet in icmp {
        let data = packet.data();
        let eth = Ethernet2HeaderSlice::from_slice(data).unwrap();
        assert_eq!(eth.ether_type(), EtherType::IPV4);

        let ip = Ipv4HeaderSlice::from_slice(&data[14..]).unwrap();
        assert_eq!(ip.protocol(), IpNumber::ICMP);
        assert_eq!(ip.ttl(), 64);
        assert_eq!(internet_checksum(ip.slice()), 0);

        let end = 14 + ip.total_len() as usize;
        let header_end = 14 + ip.slice().len();
        assert_eq!(internet_checksum(&data[header_end..end]), 0);
    }
}

#[test]
fn test_arp_request_is_broadcast() {
    let mut network = hub_behind_switch();
    let mut log = PacketLog::attach(&mut network);
    network.ping("a", Ipv4Addr::new(10, 0, 0, 2)).unwrap();
    log.poll();

    let request = &log.packets()[0];
    assert_eq!(request.protocol(), Some("ARP"));
    let eth = Ethernet2HeaderSlice::from_slice(request.data()).unwrap();
    assert_eq!(eth.destination(), [0xff; 6]);
    assert_eq!(eth.ether_type(), EtherType::ARP);
    assert_eq!(request.data().len(), 60);
}

#[test]
fn test_switch_never_forwards_out_ingress_port() {
    let mut network = hub_behind_switch();
    let mut log = PacketLog::attach(&mut network);
    let mac_a = network.interface("a", "eth0").unwrap().mac();
    let mac_b = network.interface("b", "eth0").unwrap().mac();

    network
        .send_frame("a", "eth0", mac_b, ethertype::EXPERIMENTAL, Bytes::from(vec![1; 46]))
        .unwrap();
    network.start().unwrap();
    network.run(5).unwrap();
    log.poll();
    // Unknown destination: flooded to c, never back towards the hub.
    assert_eq!(incoming_at(log.packets(), "c").len(), 1);
    assert_eq!(incoming_at(log.packets(), "hub").len(), 1);

    network
        .send_frame("b", "eth0", mac_a, ethertype::EXPERIMENTAL, Bytes::from(vec![2; 46]))
        .unwrap();
    network.run(5).unwrap();
    log.poll();
    // a was learned on the hub port, which is where b's frame came from.
    assert_eq!(incoming_at(log.packets(), "c").len(), 1);
    let hub_port = network.peer(network.interface("hub", "eth2").unwrap().id()).unwrap();
    assert!(!log
        .packets()
        .iter()
        .any(|p| p.interface_id() == Some(hub_port) && p.direction() == Direction::Outgoing));

    let table = network.switch_table("sw").unwrap();
    assert_eq!(table.len(), 2);
    assert!(table.iter().all(|(_, port)| port.as_str() == "eth0"));
}

#[test]
fn test_hub_floods_to_every_other_port() {
    let mut network = hub_behind_switch();
    let mut log = PacketLog::attach(&mut network);
    network
        .send_frame(
            "a",
            "eth0",
            netsim_core::MacAddr::BROADCAST,
            ethertype::EXPERIMENTAL,
            Bytes::new(),
        )
        .unwrap();
    network.start().unwrap();
    network.run(2).unwrap();
    log.poll();

    let hub_out: Vec<_> = log
        .packets()
        .iter()
        .filter(|p| p.device() == "hub" && p.direction() == Direction::Outgoing)
        .map(|p| p.interface().to_string())
        .collect();
    assert_eq!(hub_out, vec!["eth1", "eth2"]);
}

#[test]
fn test_capture_export_layout() {
    let mut network = hub_behind_switch();
    let mut log = PacketLog::attach(&mut network);
    network.ping("a", Ipv4Addr::new(10, 0, 0, 3)).unwrap();
    network.start().unwrap();
    network.run(10).unwrap();
    log.poll();

    let config = network.config().clone();
    let capture = export_capture(&network, log.packets(), &config).unwrap();
    assert_eq!(u32_at(&capture, 0), SHB);

    let mut offset = 0;
    let mut counts = [0usize; 3];
    let mut last_epb = None;
    while offset < capture.len() {
        let block_type = u32_at(&capture, offset);
        let total = u32_at(&capture, offset + 4) as usize;
        assert_eq!(total % 4, 0);
        assert_eq!(u32_at(&capture, offset + total - 4) as usize, total);
        match block_type {
            SHB => counts[0] += 1,
            IDB => counts[1] += 1,
            EPB => {
                counts[2] += 1;
                last_epb = Some((offset, total));
            }
            other => panic!("unexpected block type {other:#x}"),
        }
        offset += total;
    }
    assert_eq!(offset, capture.len());

    let interfaces: usize = network.devices().iter().map(|d| d.interfaces().len()).sum();
    assert_eq!(counts, [1, interfaces, log.len()]);

    let (offset, total) = last_epb.unwrap();
    let captured = u32_at(&capture, offset + 20) as usize;
    let last = log.packets().last().unwrap();
    assert_eq!(captured, last.data().len());
    assert_eq!(&capture[offset + 28..offset + 28 + captured], &last.data()[..]);
    let timestamp = (u32_at(&capture, offset + 12) as u64) << 32 | u32_at(&capture, offset + 16) as u64;
    assert_eq!(timestamp, last.time() * config.tick_micros);
    assert!(total >= 32 + captured);
}

#[test]
fn test_snaplen_truncates_capture() {
    let mut network = Network::with_config(SimulationConfig::default().with_snaplen(20));
    network.add_device(DeviceType::Host, "h1").unwrap();
    network.add_device(DeviceType::Host, "h2").unwrap();
    network.add_link("h1", None, "h2", None).unwrap();
    let mut log = PacketLog::attach(&mut network);
    network
        .send_frame("h1", "eth0", netsim_core::MacAddr::BROADCAST, ethertype::EXPERIMENTAL, Bytes::new())
        .unwrap();
    log.poll();

    let capture = export_capture(&network, log.packets(), network.config()).unwrap();
    let epb = capture.len() - u32_at(&capture, capture.len() - 4) as usize;
    assert_eq!(u32_at(&capture, epb), EPB);
    assert_eq!(u32_at(&capture, epb + 20), 20);
    assert_eq!(u32_at(&capture, epb + 24), 60);
}

#[test]
fn test_reset_returns_to_time_zero() {
    let mut network = hub_behind_switch();
    network.ping("a", Ipv4Addr::new(10, 0, 0, 2)).unwrap();
    network.start().unwrap();
    network.run(3).unwrap();
    assert!(!network.switch_table("sw").unwrap().is_empty());

    network.reset();
    assert_eq!(network.time(), 0);
    assert!(!network.is_running());
    assert!(network.switch_table("sw").unwrap().is_empty());
    assert!(network.host("a").unwrap().arp_cache().is_empty());
    assert!(network
        .devices()
        .iter()
        .flat_map(|d| d.interfaces())
        .all(|iface| iface.pending() == 0));

    network.start().unwrap();
    network.run(20).unwrap();
    assert!(network.host("a").unwrap().echo_replies().is_empty());
}

#[test]
fn test_switch_learning_emits_device_changed() {
    let mut network = hub_behind_switch();
    let events = network.subscribe();
    network
        .send_frame("c", "eth0", netsim_core::MacAddr::BROADCAST, ethertype::EXPERIMENTAL, Bytes::new())
        .unwrap();
    network.start().unwrap();
    network.run(2).unwrap();

    let changed: Vec<_> = events
        .try_iter()
        .filter_map(|event| match event {
            NetworkEvent::DeviceChanged { name, .. } => Some(name.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(changed, vec!["sw"]);
}
