//! PCAPNG capture writer.
//!
//! Produces one Section Header block, one Interface Description block per
//! interface, then one Enhanced Packet block per packet. Everything is
//! little-endian. Option lists end at the block body boundary; no
//! end-of-options marker is written.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::analysis::AnalyzedPacket;
use crate::config::SimulationConfig;
use crate::error::{CaptureError, Result};
use crate::format::MacAddr;
use crate::network::{Direction, InterfaceId, Network};

/// Block type codes.
pub mod block_type {
    pub const SECTION_HEADER: u32 = 0x0A0D_0D0A;
    pub const INTERFACE_DESCRIPTION: u32 = 0x0000_0001;
    pub const ENHANCED_PACKET: u32 = 0x0000_0006;
}

/// Option codes used by the writer.
pub mod option_code {
    pub const COMMENT: u16 = 1;
    pub const SHB_USERAPPL: u16 = 4;
    pub const IF_NAME: u16 = 2;
    pub const IF_MACADDR: u16 = 6;
    pub const IF_TSRESOL: u16 = 9;
    pub const IF_FCSLEN: u16 = 13;
    pub const EPB_FLAGS: u16 = 2;
}

pub const BYTE_ORDER_MAGIC: u32 = 0x1A2B_3C4D;
pub const LINKTYPE_ETHERNET: u16 = 1;

/// Longest option value the 16-bit length word can declare.
pub const MAX_OPTION_LEN: usize = u16::MAX as usize;

/// `if_tsresol` value for microsecond timestamps.
const TSRESOL_MICROS: u8 = 6;

/// `epb_flags` direction bits.
const FLAG_INBOUND: u32 = 0b01;
const FLAG_OUTBOUND: u32 = 0b10;

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

fn put_padded(out: &mut BytesMut, data: &[u8]) {
    out.put_slice(data);
    out.put_bytes(0, padded_len(data.len()) - data.len());
}

/// One `code | length | value` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOption {
    pub code: u16,
    pub value: Bytes,
}

impl BlockOption {
    /// Values longer than [`MAX_OPTION_LEN`] are cut to fit.
    pub fn new(code: u16, value: impl Into<Bytes>) -> Self {
        let mut value = value.into();
        if value.len() > MAX_OPTION_LEN {
            warn!(code, len = value.len(), "option value truncated");
            value.truncate(MAX_OPTION_LEN);
        }
        Self { code, value }
    }

    /// A UTF-8 option, cut on a character boundary if it is too long.
    pub fn text(code: u16, text: &str) -> Self {
        let mut end = text.len().min(MAX_OPTION_LEN);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        Self::new(code, Bytes::copy_from_slice(text[..end].as_bytes()))
    }

    pub fn u8(code: u16, value: u8) -> Self {
        Self::new(code, Bytes::copy_from_slice(&[value]))
    }

    pub fn u32(code: u16, value: u32) -> Self {
        Self::new(code, Bytes::copy_from_slice(&value.to_le_bytes()))
    }

    /// Encoded size, value padding included.
    pub fn encoded_len(&self) -> usize {
        4 + padded_len(self.value.len())
    }

    fn write_to(&self, out: &mut BytesMut) {
        out.put_u16_le(self.code);
        out.put_u16_le(self.value.len() as u16);
        put_padded(out, &self.value);
    }
}

/// A block: a fixed body followed by options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub block_type: u32,
    pub body: Bytes,
    pub options: Vec<BlockOption>,
}

impl Block {
    pub fn section_header(application: &str, comment: Option<&str>) -> Self {
        let mut body = BytesMut::with_capacity(16);
        body.put_u32_le(BYTE_ORDER_MAGIC);
        body.put_u16_le(1);
        body.put_u16_le(0);
        body.put_i64_le(-1); // section length unknown

        let mut options = Vec::with_capacity(2);
        if let Some(comment) = comment {
            options.push(BlockOption::text(option_code::COMMENT, comment));
        }
        options.push(BlockOption::text(option_code::SHB_USERAPPL, application));

        Self {
            block_type: block_type::SECTION_HEADER,
            body: body.freeze(),
            options,
        }
    }

    pub fn interface_description(snaplen: u32, name: &str, mac: MacAddr) -> Self {
        let mut body = BytesMut::with_capacity(8);
        body.put_u16_le(LINKTYPE_ETHERNET);
        body.put_u16_le(0);
        body.put_u32_le(snaplen);

        Self {
            block_type: block_type::INTERFACE_DESCRIPTION,
            body: body.freeze(),
            options: vec![
                BlockOption::text(option_code::IF_NAME, name),
                BlockOption::new(option_code::IF_MACADDR, Bytes::copy_from_slice(&mac.octets())),
                BlockOption::u8(option_code::IF_TSRESOL, TSRESOL_MICROS),
                BlockOption::u8(option_code::IF_FCSLEN, 0),
            ],
        }
    }

    /// A packet captured on interface `interface` at `micros`.
    ///
    /// At most `snaplen` bytes are stored; the original length is kept.
    pub fn enhanced_packet(
        interface: u32,
        micros: u64,
        data: &[u8],
        snaplen: u32,
        direction: Direction,
    ) -> Self {
        let captured = &data[..data.len().min(snaplen as usize)];
        let mut body = BytesMut::with_capacity(20 + padded_len(captured.len()));
        body.put_u32_le(interface);
        body.put_u32_le((micros >> 32) as u32);
        body.put_u32_le(micros as u32);
        body.put_u32_le(captured.len() as u32);
        body.put_u32_le(data.len() as u32);
        put_padded(&mut body, captured);

        let flags = match direction {
            Direction::Incoming => FLAG_INBOUND,
            Direction::Outgoing => FLAG_OUTBOUND,
        };
        Self {
            block_type: block_type::ENHANCED_PACKET,
            body: body.freeze(),
            options: vec![BlockOption::u32(option_code::EPB_FLAGS, flags)],
        }
    }

    /// Body plus options, padded to a multiple of four.
    pub fn body_len(&self) -> usize {
        padded_len(self.body.len()) + self.options.iter().map(BlockOption::encoded_len).sum::<usize>()
    }

    /// Size on disk: the body framed by type and two length words.
    pub fn total_len(&self) -> usize {
        self.body_len() + 12
    }

    pub fn write_to(&self, out: &mut BytesMut) {
        let total = self.total_len() as u32;
        out.reserve(total as usize);
        out.put_u32_le(self.block_type);
        out.put_u32_le(total);
        put_padded(out, &self.body);
        for option in &self.options {
            option.write_to(out);
        }
        out.put_u32_le(total);
    }
}

/// Accumulates a capture in memory.
#[derive(Debug)]
pub struct CaptureWriter {
    out: BytesMut,
    interfaces: BTreeMap<InterfaceId, u32>,
    snaplen: u32,
    tick_micros: u64,
    packets: usize,
}

impl CaptureWriter {
    /// Start a section. Interfaces must be added before their packets.
    pub fn new(config: &SimulationConfig, application: &str, comment: Option<&str>) -> Self {
        let mut out = BytesMut::new();
        Block::section_header(application, comment).write_to(&mut out);
        Self {
            out,
            interfaces: BTreeMap::new(),
            snaplen: config.snaplen,
            tick_micros: config.tick_micros,
            packets: 0,
        }
    }

    /// Describe an interface and return its capture index.
    pub fn add_interface(&mut self, id: InterfaceId, name: &str, mac: MacAddr) -> u32 {
        if let Some(&index) = self.interfaces.get(&id) {
            return index;
        }
        let index = self.interfaces.len() as u32;
        Block::interface_description(self.snaplen, name, mac).write_to(&mut self.out);
        self.interfaces.insert(id, index);
        index
    }

    pub fn add_packet(&mut self, packet: &AnalyzedPacket) -> std::result::Result<(), CaptureError> {
        let index = packet
            .interface_id()
            .and_then(|id| self.interfaces.get(&id).copied())
            .ok_or_else(|| CaptureError::UnknownInterface {
                id: packet.id(),
                device: packet.device().to_string(),
                interface: packet.interface().to_string(),
            })?;

        let micros = packet.time().saturating_mul(self.tick_micros);
        Block::enhanced_packet(index, micros, packet.data(), self.snaplen, packet.direction())
            .write_to(&mut self.out);
        self.packets += 1;
        Ok(())
    }

    pub fn finish(self) -> Bytes {
        debug!(
            interfaces = self.interfaces.len(),
            packets = self.packets,
            bytes = self.out.len(),
            "capture written"
        );
        self.out.freeze()
    }
}

/// Export `packets` observed on `network` as a PCAPNG capture.
///
/// Every interface present in the network is described, in device then
/// interface order, named `device:interface`.
pub fn export_capture(
    network: &Network,
    packets: &[AnalyzedPacket],
    config: &SimulationConfig,
) -> Result<Bytes> {
    let mut writer = CaptureWriter::new(config, concat!("netsim ", env!("CARGO_PKG_VERSION")), None);
    for device in network.devices() {
        for iface in device.interfaces() {
            let name = format!("{}:{}", device.name(), iface.name());
            writer.add_interface(iface.id(), &name, iface.mac());
        }
    }
    for packet in packets {
        writer.add_packet(packet)?;
    }
    Ok(writer.finish())
}
