//! End hosts: accept frames addressed to them and speak just enough ARP and
//! ICMP to answer and originate pings.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, trace};

use super::{DeviceBehavior, DeviceContext, DeviceType, Interface, InterfaceId};
use crate::format::MacAddr;
use crate::protocol::arp::operation;
use crate::protocol::ethernet::HEADER_LEN;
use crate::protocol::{
    ethertype, icmp_type, ip_protocol, ArpProtocol, BuiltinProtocol, EthernetProtocol,
    IcmpProtocol, Ipv4Protocol, Packet,
};

/// Identifier carried by every echo request a host originates.
pub const PING_IDENTIFIER: u16 = 0x0001;

const PING_PAYLOAD: &[u8] = b"abcdefghijklmnopqrstuvwabcdefghi";

/// A frame a host accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceivedFrame {
    pub time: u64,
    #[serde(skip)]
    pub interface: InterfaceId,
    pub source: MacAddr,
    pub destination: MacAddr,
    pub ethertype: u16,
    /// Everything after the Ethernet header, link padding included.
    #[serde(skip)]
    pub payload: Bytes,
}

/// An echo reply a host received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EchoReply {
    pub time: u64,
    pub from: Ipv4Addr,
    pub identifier: u16,
    pub sequence: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingPing {
    interface: InterfaceId,
    target: Ipv4Addr,
    sequence: u16,
}

#[derive(Debug, Clone, Default)]
pub struct Host {
    arp_cache: BTreeMap<Ipv4Addr, MacAddr>,
    pending: Vec<PendingPing>,
    received: Vec<ReceivedFrame>,
    replies: Vec<EchoReply>,
    next_sequence: u16,
}

impl Host {
    /// Resolved neighbours, ordered by address.
    pub fn arp_cache(&self) -> &BTreeMap<Ipv4Addr, MacAddr> {
        &self.arp_cache
    }

    /// Frames accepted so far, oldest first.
    pub fn received(&self) -> &[ReceivedFrame] {
        &self.received
    }

    pub fn echo_replies(&self) -> &[EchoReply] {
        &self.replies
    }

    /// Pings still waiting for ARP resolution.
    pub fn pending_pings(&self) -> usize {
        self.pending.len()
    }

    /// Send an echo request to `target` out of `egress`.
    ///
    /// An unresolved target is asked for with a broadcast ARP request and
    /// the echo is held until the reply arrives.
    pub(crate) fn ping(&mut self, ctx: &mut DeviceContext<'_>, egress: InterfaceId, target: Ipv4Addr) {
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let ping = PendingPing {
            interface: egress,
            target,
            sequence: self.next_sequence,
        };
        let Some(iface) = ctx.interface(egress) else {
            return;
        };

        match self.arp_cache.get(&target) {
            Some(&mac) => send_echo(ctx, iface, mac, &ping),
            None => {
                let Some(own) = iface.ipv4() else {
                    return;
                };
                debug!(%target, "resolving ping target");
                let request = ArpProtocol::request(iface.mac(), own, target);
                let frame = EthernetProtocol::frame(MacAddr::BROADCAST, iface.mac(), ethertype::ARP, request);
                ctx.send(egress, frame.serialize());
                self.pending.push(ping);
            }
        }
    }

    fn handle_arp(&mut self, ctx: &mut DeviceContext<'_>, iface: &Interface, arp: &Packet) {
        let (Some(sha), Some(spa), Some(oper)) =
            (arp.get_mac("sha"), arp.get_ipv4("spa"), arp.get_u64("oper"))
        else {
            return;
        };
        let own = iface.ipv4();
        let for_us = own.is_some() && arp.get_ipv4("tpa") == own;

        if for_us || self.arp_cache.contains_key(&spa) {
            if self.arp_cache.insert(spa, sha) != Some(sha) {
                trace!(ip = %spa, mac = %sha, "learned neighbour");
                ctx.mark_changed();
            }
        }

        if for_us && oper == operation::REQUEST as u64 {
            if let Some(reply) = ArpProtocol::reply_to(arp, iface.mac()) {
                let frame = EthernetProtocol::frame(sha, iface.mac(), ethertype::ARP, reply);
                ctx.send(iface.id(), frame.serialize());
            }
        }

        self.flush_pending(ctx);
    }

    fn flush_pending(&mut self, ctx: &mut DeviceContext<'_>) {
        let (ready, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|ping| self.arp_cache.contains_key(&ping.target));
        self.pending = waiting;

        for ping in ready {
            if let (Some(iface), Some(&mac)) = (ctx.interface(ping.interface), self.arp_cache.get(&ping.target)) {
                send_echo(ctx, iface, mac, &ping);
            }
        }
    }

    fn handle_ipv4(&mut self, ctx: &mut DeviceContext<'_>, iface: &Interface, peer_mac: MacAddr, ip: &Packet) {
        let Some(own) = iface.ipv4() else {
            return;
        };
        if ip.get_ipv4("dst") != Some(own) {
            return;
        }
        let (Some(peer), Some(icmp)) = (ip.get_ipv4("src"), ip.next()) else {
            return;
        };
        if !matches!(icmp.protocol(), BuiltinProtocol::Icmp(_)) {
            return;
        }

        match icmp.get_u64("type").map(|t| t as u8) {
            Some(icmp_type::ECHO_REQUEST) => {
                let Some(reply) = IcmpProtocol::echo_reply(icmp) else {
                    return;
                };
                let identification = ip.get_u64("identification").unwrap_or(0) as u16;
                let datagram = Ipv4Protocol::datagram(own, peer, ip_protocol::ICMP, identification, reply);
                let frame = EthernetProtocol::frame(peer_mac, iface.mac(), ethertype::IPV4, datagram);
                ctx.send(iface.id(), frame.serialize());
            }
            Some(icmp_type::ECHO_REPLY) => {
                let reply = EchoReply {
                    time: ctx.time(),
                    from: peer,
                    identifier: icmp.get_u64("identifier").unwrap_or(0) as u16,
                    sequence: icmp.get_u64("sequence").unwrap_or(0) as u16,
                };
                debug!(from = %peer, seq = reply.sequence, "echo reply");
                self.replies.push(reply);
            }
            _ => {}
        }
    }
}

fn send_echo(ctx: &mut DeviceContext<'_>, iface: &Interface, dst: MacAddr, ping: &PendingPing) {
    let Some(own) = iface.ipv4() else {
        return;
    };
    let icmp = IcmpProtocol::echo(icmp_type::ECHO_REQUEST, PING_IDENTIFIER, ping.sequence, PING_PAYLOAD);
    let datagram = Ipv4Protocol::datagram(own, ping.target, ip_protocol::ICMP, ping.sequence, icmp);
    let frame = EthernetProtocol::frame(dst, iface.mac(), ethertype::IPV4, datagram);
    ctx.send(iface.id(), frame.serialize());
}

impl DeviceBehavior for Host {
    fn device_type(&self) -> DeviceType {
        DeviceType::Host
    }

    fn receive(&mut self, ctx: &mut DeviceContext<'_>, ingress: InterfaceId, data: &Bytes) {
        let Some(iface) = ctx.interface(ingress) else {
            return;
        };
        let frame = Packet::decode(EthernetProtocol, data, ctx.layers());
        if frame.header_truncated() {
            trace!(len = data.len(), "host dropping runt frame");
            return;
        }
        let (Some(dst), Some(src), Some(ethertype)) =
            (frame.get_mac("dst"), frame.get_mac("src"), frame.get_u64("ethertype"))
        else {
            return;
        };
        if dst != iface.mac() && !dst.is_multicast() {
            trace!(%dst, "host ignoring frame for another station");
            return;
        }

        self.received.push(ReceivedFrame {
            time: ctx.time(),
            interface: ingress,
            source: src,
            destination: dst,
            ethertype: ethertype as u16,
            payload: data.slice(HEADER_LEN..),
        });

        match frame.next() {
            Some(arp) if matches!(arp.protocol(), BuiltinProtocol::Arp(_)) => {
                self.handle_arp(ctx, iface, arp)
            }
            Some(ip) if matches!(ip.protocol(), BuiltinProtocol::Ipv4(_)) => {
                self.handle_ipv4(ctx, iface, src, ip)
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        *self = Host::default();
    }

    fn interface_removed(&mut self, interface: InterfaceId) {
        self.pending.retain(|ping| ping.interface != interface);
    }
}
