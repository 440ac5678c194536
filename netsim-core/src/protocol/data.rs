//! Terminal layer for bytes no other protocol claims.

use super::{Packet, Protocol};
use crate::schema::{DataKind, FieldDescriptor};

static FIELDS: [FieldDescriptor; 1] =
    [FieldDescriptor::new("data", DataKind::Remainder).with_label("Data")];

/// Opaque payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataProtocol;

impl DataProtocol {
    pub fn packet(data: &[u8]) -> Packet {
        let mut packet = Packet::new(DataProtocol);
        packet.store("data", data.into());
        packet
    }
}

impl Protocol for DataProtocol {
    fn name(&self) -> &'static str {
        "data"
    }

    fn display_name(&self) -> &'static str {
        "Data"
    }

    fn fields(&self) -> &'static [FieldDescriptor] {
        &FIELDS
    }
}
