//! Protocol descriptors and static dispatch over the built-in set.

use crate::analysis::{AnalysisTree, Summary};
use crate::schema::FieldDescriptor;

use super::{
    ArpProtocol, DataProtocol, EthernetProtocol, IcmpProtocol, Ipv4Protocol, Packet, TcpProtocol,
    UdpProtocol,
};

/// Core trait every protocol descriptor implements.
///
/// A protocol is a declarative wire layout (`fields`, then the encapsulated
/// layer, then `post_fields`) plus dissection hooks. Descriptors are
/// stateless; per-packet state lives in [`Packet`].
pub trait Protocol: Send + Sync {
    /// Unique identifier for this protocol (e.g., "ethernet", "tcp").
    fn name(&self) -> &'static str;

    /// Human-readable display name.
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Header fields, in wire order.
    fn fields(&self) -> &'static [FieldDescriptor];

    /// Trailing fields parsed after the encapsulated layer.
    fn post_fields(&self) -> &'static [FieldDescriptor] {
        &[]
    }

    /// How many bytes after the header belong to the encapsulated layer.
    ///
    /// `None` hands the next layer everything that is left.
    fn payload_len(&self, _packet: &Packet) -> Option<usize> {
        None
    }

    /// Derive summary strings and describe this layer's byte spans.
    ///
    /// Runs before the encapsulated layer is dissected.
    fn dissect(&self, packet: &Packet, _summary: &mut Summary) -> AnalysisTree {
        packet.field_tree(self.display_name())
    }

    /// Refine the summary once every inner layer has been dissected.
    fn post_dissect(&self, _packet: &Packet, _tree: &mut AnalysisTree, _summary: &mut Summary) {}
}

/// Enum of all built-in protocols.
///
/// This enables static dispatch (no vtable overhead) and lets a [`Packet`]
/// carry its protocol by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinProtocol {
    Ethernet(EthernetProtocol),
    Arp(ArpProtocol),
    Ipv4(Ipv4Protocol),
    Icmp(IcmpProtocol),
    Udp(UdpProtocol),
    Tcp(TcpProtocol),
    Data(DataProtocol),
}

/// Macro to delegate Protocol trait methods to inner types.
macro_rules! delegate_protocol {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            BuiltinProtocol::Ethernet(p) => p.$method($($arg),*),
            BuiltinProtocol::Arp(p) => p.$method($($arg),*),
            BuiltinProtocol::Ipv4(p) => p.$method($($arg),*),
            BuiltinProtocol::Icmp(p) => p.$method($($arg),*),
            BuiltinProtocol::Udp(p) => p.$method($($arg),*),
            BuiltinProtocol::Tcp(p) => p.$method($($arg),*),
            BuiltinProtocol::Data(p) => p.$method($($arg),*),
        }
    };
}

impl BuiltinProtocol {
    /// Look up a declared field (header or trailing) by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields()
            .iter()
            .chain(self.post_fields())
            .find(|field| field.name == name)
    }
}

impl Protocol for BuiltinProtocol {
    #[inline]
    fn name(&self) -> &'static str {
        delegate_protocol!(self, name)
    }

    #[inline]
    fn display_name(&self) -> &'static str {
        delegate_protocol!(self, display_name)
    }

    #[inline]
    fn fields(&self) -> &'static [FieldDescriptor] {
        delegate_protocol!(self, fields)
    }

    #[inline]
    fn post_fields(&self) -> &'static [FieldDescriptor] {
        delegate_protocol!(self, post_fields)
    }

    #[inline]
    fn payload_len(&self, packet: &Packet) -> Option<usize> {
        delegate_protocol!(self, payload_len, packet)
    }

    #[inline]
    fn dissect(&self, packet: &Packet, summary: &mut Summary) -> AnalysisTree {
        delegate_protocol!(self, dissect, packet, summary)
    }

    #[inline]
    fn post_dissect(&self, packet: &Packet, tree: &mut AnalysisTree, summary: &mut Summary) {
        delegate_protocol!(self, post_dissect, packet, tree, summary)
    }
}

impl std::fmt::Display for BuiltinProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Conversion traits for ergonomic registration.
impl From<EthernetProtocol> for BuiltinProtocol {
    fn from(p: EthernetProtocol) -> Self {
        BuiltinProtocol::Ethernet(p)
    }
}

impl From<ArpProtocol> for BuiltinProtocol {
    fn from(p: ArpProtocol) -> Self {
        BuiltinProtocol::Arp(p)
    }
}

impl From<Ipv4Protocol> for BuiltinProtocol {
    fn from(p: Ipv4Protocol) -> Self {
        BuiltinProtocol::Ipv4(p)
    }
}

impl From<IcmpProtocol> for BuiltinProtocol {
    fn from(p: IcmpProtocol) -> Self {
        BuiltinProtocol::Icmp(p)
    }
}

impl From<UdpProtocol> for BuiltinProtocol {
    fn from(p: UdpProtocol) -> Self {
        BuiltinProtocol::Udp(p)
    }
}

impl From<TcpProtocol> for BuiltinProtocol {
    fn from(p: TcpProtocol) -> Self {
        BuiltinProtocol::Tcp(p)
    }
}

impl From<DataProtocol> for BuiltinProtocol {
    fn from(p: DataProtocol) -> Self {
        BuiltinProtocol::Data(p)
    }
}
