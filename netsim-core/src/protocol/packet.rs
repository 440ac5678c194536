//! Packet instances: field values for one protocol layer plus the layer it
//! encapsulates.

use std::net::Ipv4Addr;

use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;

use super::{BuiltinProtocol, FieldValue, LayerTable, Protocol};
use crate::analysis::{AnalysisTree, AnalyzedPacket};
use crate::error::ProtocolError;
use crate::format::MacAddr;
use crate::schema::FieldDescriptor;

/// Where a parsed field sits, relative to the start of its packet.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpan {
    pub field: &'static FieldDescriptor,
    pub start: usize,
    pub len: usize,
}

/// One protocol layer.
///
/// Each packet owns the packet it encapsulates (`next`) exclusively, so a
/// decoded frame is a singly-owned chain such as Ethernet → IPv4 → ICMP →
/// Data.
#[derive(Debug, Clone)]
pub struct Packet {
    protocol: BuiltinProtocol,
    values: SmallVec<[(&'static str, FieldValue); 12]>,
    spans: SmallVec<[FieldSpan; 12]>,
    header_len: usize,
    truncated: bool,
    next: Option<Box<Packet>>,
}

impl Packet {
    /// Create an empty packet with every field unset.
    pub fn new<P: Into<BuiltinProtocol>>(protocol: P) -> Self {
        Self {
            protocol: protocol.into(),
            values: SmallVec::new(),
            spans: SmallVec::new(),
            header_len: 0,
            truncated: false,
            next: None,
        }
    }

    /// Create a packet from `(field, value)` pairs.
    ///
    /// # Example
    ///
    /// ```
    /// use netsim_core::protocol::{FieldValue, Packet, UdpProtocol};
    ///
    /// let udp = Packet::from_values(
    ///     UdpProtocol,
    ///     [("src_port", FieldValue::from(53u16)), ("dst_port", FieldValue::from(4000u16))],
    /// )
    /// .unwrap();
    /// assert_eq!(udp.get_u64("src_port"), Some(53));
    /// ```
    pub fn from_values<'n, P, I>(protocol: P, values: I) -> Result<Self, ProtocolError>
    where
        P: Into<BuiltinProtocol>,
        I: IntoIterator<Item = (&'n str, FieldValue)>,
    {
        let mut packet = Self::new(protocol);
        for (name, value) in values {
            packet.set(name, value)?;
        }
        Ok(packet)
    }

    /// Parse `data` as `protocol`, following layer bindings.
    ///
    /// Bytes nobody claims are dropped; use [`Packet::parse_from`] to keep
    /// them.
    pub fn decode<P: Into<BuiltinProtocol>>(protocol: P, data: &[u8], layers: &LayerTable) -> Self {
        let mut packet = Self::new(protocol);
        packet.parse_from(data, layers);
        packet
    }

    /// Parse only the declared header fields of `protocol`.
    pub fn decode_header<P: Into<BuiltinProtocol>>(protocol: P, data: &[u8]) -> Self {
        let mut packet = Self::new(protocol);
        let fields = packet.protocol.fields();
        let (_, position) = packet.parse_fields(fields, data, 0);
        packet.header_len = position;
        packet
    }

    /// Builder: set a field, checking its name and kind.
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Result<Self, ProtocolError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Builder: attach the encapsulated packet.
    pub fn with_next(mut self, next: Packet) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// Set a field. The value is converted to the field's kind when it fits.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), ProtocolError> {
        let protocol = self.protocol;
        let descriptor = protocol
            .field(name)
            .ok_or_else(|| ProtocolError::UnknownField {
                protocol: protocol.name(),
                field: name.to_string(),
            })?;
        let value = descriptor
            .kind
            .coerce(value.into())
            .ok_or(ProtocolError::KindMismatch {
                protocol: protocol.name(),
                field: descriptor.name,
                expected: descriptor.kind.type_name(),
            })?;
        self.store(descriptor.name, value);
        Ok(())
    }

    /// Clear a field, returning its previous value.
    pub fn unset(&mut self, name: &str) -> Option<FieldValue> {
        let index = self.values.iter().position(|(n, _)| *n == name)?;
        Some(self.values.remove(index).1)
    }

    /// Store a value without validation. Callers pass a declared field name
    /// and a value of the declared kind.
    pub(crate) fn store(&mut self, name: &'static str, value: FieldValue) {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub(crate) fn mark_truncated(&mut self) {
        self.truncated = true;
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(FieldValue::as_u64)
    }

    pub fn get_mac(&self, name: &str) -> Option<MacAddr> {
        self.get(name).and_then(FieldValue::as_mac)
    }

    pub fn get_ipv4(&self, name: &str) -> Option<Ipv4Addr> {
        self.get(name).and_then(FieldValue::as_ipv4)
    }

    pub fn get_bytes(&self, name: &str) -> Option<&Bytes> {
        self.get(name).and_then(FieldValue::as_bytes)
    }

    pub fn protocol(&self) -> BuiltinProtocol {
        self.protocol
    }

    pub fn name(&self) -> &'static str {
        self.protocol.name()
    }

    /// Bytes consumed by the declared header fields during parsing.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Byte spans recorded while parsing, header fields first.
    pub fn spans(&self) -> &[FieldSpan] {
        &self.spans
    }

    /// Whether a field of this layer ran out of input.
    pub fn header_truncated(&self) -> bool {
        self.truncated
    }

    /// Whether any layer of the chain ran out of input.
    pub fn is_truncated(&self) -> bool {
        self.layers().any(|layer| layer.truncated)
    }

    pub fn next(&self) -> Option<&Packet> {
        self.next.as_deref()
    }

    pub fn next_mut(&mut self) -> Option<&mut Packet> {
        self.next.as_deref_mut()
    }

    pub fn set_next(&mut self, next: Option<Packet>) {
        self.next = next.map(Box::new);
    }

    pub fn take_next(&mut self) -> Option<Packet> {
        self.next.take().map(|next| *next)
    }

    /// This packet followed by every encapsulated layer, outermost first.
    pub fn layers(&self) -> impl Iterator<Item = &Packet> {
        std::iter::successors(Some(self), |packet| packet.next())
    }

    /// First layer of the chain with the given protocol name.
    pub fn find(&self, name: &str) -> Option<&Packet> {
        self.layers().find(|layer| layer.name() == name)
    }

    /// Parse this packet from `data` and return the bytes nothing consumed.
    ///
    /// Header fields are read first. The layer table is then consulted with
    /// the populated header; a matching protocol parses the payload (bounded
    /// by [`Protocol::payload_len`]) and becomes `next`. Trailing fields
    /// consume what the inner layer left.
    pub fn parse_from<'a>(&mut self, data: &'a [u8], layers: &LayerTable) -> &'a [u8] {
        let protocol = self.protocol;
        let (mut rest, mut position) = self.parse_fields(protocol.fields(), data, 0);
        self.header_len = position;

        if !rest.is_empty() {
            if let Some(inner) = layers.resolve(self) {
                let bound = protocol
                    .payload_len(self)
                    .map_or(rest.len(), |len| len.min(rest.len()));
                let payload = &rest[..bound];

                let mut next = Packet::new(inner);
                let leftover = next.parse_from(payload, layers);
                let used = payload.len() - leftover.len();

                rest = &rest[used..];
                position += used;
                self.next = Some(Box::new(next));
            }
        }

        let (rest, _) = self.parse_fields(protocol.post_fields(), rest, position);
        rest
    }

    fn parse_fields<'a>(
        &mut self,
        fields: &'static [FieldDescriptor],
        mut data: &'a [u8],
        mut position: usize,
    ) -> (&'a [u8], usize) {
        for field in fields {
            let before = data.len();
            data = field.parse(data, position, self);
            let len = before - data.len();
            self.spans.push(FieldSpan {
                field,
                start: position,
                len,
            });
            position += len;
        }
        (data, position)
    }

    /// Encode the whole chain.
    pub fn serialize(&self) -> Bytes {
        let mut out = BytesMut::new();
        self.serialize_into(&mut out);
        out.freeze()
    }

    /// Append header fields, the encapsulated packet, then trailing fields.
    pub fn serialize_into(&self, out: &mut BytesMut) {
        let start = out.len();
        for field in self.protocol.fields() {
            let written = out.len() - start;
            field.serialize(out, written, self);
        }
        if let Some(next) = &self.next {
            next.serialize_into(out);
        }
        for field in self.protocol.post_fields() {
            let written = out.len() - start;
            field.serialize(out, written, self);
        }
    }

    /// One item per parsed field, positioned relative to this packet.
    ///
    /// Packets built from values have no spans and yield an empty tree.
    pub fn field_tree(&self, label: &str) -> AnalysisTree {
        let mut tree = AnalysisTree::new(label, 0, self.header_len);
        for span in &self.spans {
            let text = match self.get(span.field.name) {
                Some(value) => format!("{}: {}", span.field.label, span.field.display(value)),
                None => format!("{}: <truncated>", span.field.label),
            };
            tree.add_item(text, span.start, span.len);
        }
        tree
    }

    /// Dissect this layer and every layer inside it into `analyzed`.
    ///
    /// Layers attach outermost first; post-dissection runs innermost first so
    /// outer layers can refine what inner layers reported.
    pub fn dissect(&self, analyzed: &mut AnalyzedPacket) {
        let tree = self.protocol.dissect(self, &mut analyzed.summary);
        let index = analyzed.tree.add_tree(tree);

        if let Some(next) = &self.next {
            next.dissect(analyzed);
        }

        if let Some(tree) = analyzed.tree.subtree_mut(index) {
            self.protocol.post_dissect(self, tree, &mut analyzed.summary);
        }
    }
}

impl PartialEq for Packet {
    /// Two packets are equal when they carry the same protocol, the same
    /// field values and equal encapsulated packets.
    fn eq(&self, other: &Self) -> bool {
        self.protocol == other.protocol
            && self
                .protocol
                .fields()
                .iter()
                .chain(self.protocol.post_fields())
                .all(|field| self.get(field.name) == other.get(field.name))
            && self.next == other.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        default_layers, DataProtocol, EthernetProtocol, IcmpProtocol, Ipv4Protocol, UdpProtocol,
    };

    #[test]
    fn test_set_validates_name_and_kind() {
        let mut udp = Packet::new(UdpProtocol);
        assert!(udp.set("src_port", 53u16).is_ok());
        assert!(udp.set("length", 8u8).is_ok());
        assert_eq!(udp.get("length"), Some(&FieldValue::UInt16(8)));

        assert_eq!(
            udp.set("nope", 1u8),
            Err(ProtocolError::UnknownField {
                protocol: "udp",
                field: "nope".to_string()
            })
        );
        assert!(matches!(
            udp.set("src_port", MacAddr::BROADCAST),
            Err(ProtocolError::KindMismatch { field: "src_port", .. })
        ));
        assert!(matches!(
            udp.set("src_port", 70_000u32),
            Err(ProtocolError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_unset_and_skip_on_serialize() {
        let mut udp = Packet::from_values(
            UdpProtocol,
            [
                ("src_port", FieldValue::from(1u16)),
                ("dst_port", FieldValue::from(2u16)),
                ("length", FieldValue::from(8u16)),
                ("checksum", FieldValue::from(0u16)),
            ],
        )
        .unwrap();
        assert_eq!(udp.serialize().len(), 8);

        assert_eq!(udp.unset("checksum"), Some(FieldValue::UInt16(0)));
        assert_eq!(udp.serialize().len(), 6);
    }

    #[test]
    fn test_chain_parse_and_reserialize() {
        let layers = default_layers();
        let frame = crate::protocol::test_utils::icmp_echo_frame(b"ping!");

        let packet = Packet::decode(EthernetProtocol, &frame, &layers);
        let names: Vec<_> = packet.layers().map(Packet::name).collect();
        assert_eq!(names, vec!["ethernet", "ipv4", "icmp", "data"]);
        assert!(!packet.is_truncated());

        assert_eq!(&packet.serialize()[..], &frame[..]);
    }

    #[test]
    fn test_payload_len_bounds_inner_layer() {
        let layers = default_layers();
        let frame = crate::protocol::test_utils::icmp_echo_frame(b"");
        assert_eq!(frame.len(), 60);

        let packet = Packet::decode(EthernetProtocol, &frame, &layers);
        // 14 + 20 + 8 = 42 bytes of headers, the rest is link padding
        let padding = packet.get_bytes("padding").unwrap();
        assert_eq!(padding.len(), 18);
        assert!(packet.find("data").is_none());
        assert_eq!(&packet.serialize()[..], &frame[..]);
    }

    #[test]
    fn test_truncated_header() {
        let layers = default_layers();
        let packet = Packet::decode(EthernetProtocol, &[0xff; 10], &layers);
        assert!(packet.header_truncated());
        assert!(packet.get_mac("dst").is_some());
        assert!(packet.get_mac("src").is_none());
        assert!(packet.next().is_none());
    }

    #[test]
    fn test_find_and_take_next() {
        let mut packet = Packet::new(Ipv4Protocol)
            .with_next(Packet::new(IcmpProtocol).with_next(Packet::new(DataProtocol)));
        assert!(packet.find("data").is_some());
        assert!(packet.find("tcp").is_none());

        let icmp = packet.take_next().unwrap();
        assert_eq!(icmp.name(), "icmp");
        assert!(packet.next().is_none());
    }

    #[test]
    fn test_decode_header_stops_at_header() {
        let frame = crate::protocol::test_utils::icmp_echo_frame(b"x");
        let header = Packet::decode_header(EthernetProtocol, &frame);
        assert_eq!(header.header_len(), 14);
        assert_eq!(header.get_u64("ethertype"), Some(0x0800));
        assert!(header.next().is_none());
    }
}
