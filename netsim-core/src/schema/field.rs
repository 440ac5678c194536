//! Field descriptor: one named slot in a protocol's wire layout.

use bytes::{BufMut, BytesMut};

use super::DataKind;
use crate::protocol::{FieldValue, Packet};

/// Declarative field definition.
///
/// A protocol is an ordered list of these. Parsing and serializing walk the
/// list in the same order, so the declaration order *is* the wire order.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Field name (snake_case, e.g., "src_port")
    pub name: &'static str,

    /// Label used in dissection trees (e.g., "Source Port")
    pub label: &'static str,

    /// Wire layout
    pub kind: DataKind,
}

impl FieldDescriptor {
    /// Create a field whose label is its name.
    pub const fn new(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            label: name,
            kind,
        }
    }

    /// Builder: set the display label.
    pub const fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Read this field from the front of `data`, storing the decoded value
    /// on `packet`, and return what is left.
    ///
    /// `position` is the number of bytes the owning packet has consumed so
    /// far; only [`DataKind::Padding`] looks at it.
    ///
    /// Short input never fails: a fixed-width field that does not fit stays
    /// unset, the packet is flagged truncated, and the rest of the input is
    /// consumed.
    pub fn parse<'a>(&self, data: &'a [u8], position: usize, packet: &mut Packet) -> &'a [u8] {
        let take = match self.kind.fixed_size() {
            Some(size) if data.len() < size => {
                packet.mark_truncated();
                return &data[data.len()..];
            }
            Some(size) => size,
            None => match self.kind {
                DataKind::Padding(total) => data.len().min(total.saturating_sub(position)),
                DataKind::Bytes(length) => {
                    let wanted = length(packet);
                    if wanted > data.len() {
                        packet.mark_truncated();
                    }
                    wanted.min(data.len())
                }
                _ => data.len(),
            },
        };

        let (head, rest) = data.split_at(take);
        if let Some(value) = self.kind.decode(head) {
            packet.store(self.name, value);
        }
        rest
    }

    /// Append this field's encoding to `out`.
    ///
    /// `written` is the number of bytes the owning packet has emitted so far.
    /// Unset values are skipped. Padding fills the packet up to its target
    /// length, reusing the stored bytes first and zero-filling the rest.
    pub fn serialize(&self, out: &mut BytesMut, written: usize, packet: &Packet) {
        if let DataKind::Padding(total) = self.kind {
            let need = total.saturating_sub(written);
            let stored = packet
                .get(self.name)
                .and_then(FieldValue::as_bytes)
                .map(|b| &b[..b.len().min(need)])
                .unwrap_or_default();
            out.put_slice(stored);
            out.put_bytes(0, need - stored.len());
            return;
        }

        if let Some(value) = packet.get(self.name) {
            self.kind.encode(value, out);
        }
    }

    /// Render `value` for a dissection tree line.
    pub fn display(&self, value: &FieldValue) -> String {
        self.kind.display(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DataProtocol;

    fn scratch() -> Packet {
        Packet::new(DataProtocol)
    }

    #[test]
    fn test_field_creation() {
        let field = FieldDescriptor::new("ttl", DataKind::UInt8).with_label("Time to Live");
        assert_eq!(field.name, "ttl");
        assert_eq!(field.label, "Time to Live");
        assert_eq!(FieldDescriptor::new("x", DataKind::Mac).label, "x");
    }

    #[test]
    fn test_padding_consumes_up_to_target() {
        let field = FieldDescriptor::new("padding", DataKind::Padding(60));
        let data = [0u8; 30];

        let mut packet = scratch();
        let rest = field.parse(&data, 42, &mut packet);
        assert_eq!(rest.len(), 12);
        assert_eq!(packet.get_bytes("padding").map(|b| b.len()), Some(18));

        let mut packet = scratch();
        let rest = field.parse(&data, 75, &mut packet);
        assert_eq!(rest.len(), 30);
        assert_eq!(packet.get_bytes("padding").map(|b| b.len()), Some(0));
        assert!(!packet.is_truncated());
    }

    #[test]
    fn test_padding_serializes_to_target_length() {
        let field = FieldDescriptor::new("padding", DataKind::Padding(60));
        let packet = scratch();

        let mut out = BytesMut::from(&[0xaa; 20][..]);
        field.serialize(&mut out, 20, &packet);
        assert_eq!(out.len(), 60);
        assert!(out[20..].iter().all(|&b| b == 0));

        let mut out = BytesMut::from(&[0xaa; 64][..]);
        field.serialize(&mut out, 64, &packet);
        assert_eq!(out.len(), 64);
    }

    #[test]
    fn test_padding_reuses_stored_bytes() {
        let field = FieldDescriptor::new("padding", DataKind::Padding(8));
        let mut packet = scratch();
        packet.store("padding", FieldValue::from(vec![1u8, 2, 3]));

        let mut out = BytesMut::from(&[9u8; 4][..]);
        field.serialize(&mut out, 4, &packet);
        assert_eq!(&out[..], &[9, 9, 9, 9, 1, 2, 3, 0]);
    }

    #[test]
    fn test_short_fixed_field_truncates() {
        let field = FieldDescriptor::new("value", DataKind::UInt32);
        let mut packet = scratch();
        let rest = field.parse(&[1, 2], 0, &mut packet);
        assert!(rest.is_empty());
        assert!(packet.get("value").is_none());
        assert!(packet.is_truncated());
    }

    #[test]
    fn test_unset_value_skipped_on_serialize() {
        let field = FieldDescriptor::new("value", DataKind::UInt16);
        let mut out = BytesMut::new();
        field.serialize(&mut out, 0, &scratch());
        assert!(out.is_empty());
    }

    #[test]
    fn test_remainder_takes_everything() {
        let field = FieldDescriptor::new("value", DataKind::Remainder);
        let mut packet = scratch();
        let rest = field.parse(b"hello", 3, &mut packet);
        assert!(rest.is_empty());
        assert_eq!(packet.get_bytes("value").map(|b| &b[..]), Some(&b"hello"[..]));
    }
}
