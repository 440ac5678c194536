//! PCAPNG capture export.
//!
//! The main types are:
//! - [`CaptureWriter`] - Builds a capture section block by block
//! - [`Block`] and [`BlockOption`] - The framed units of the format
//! - [`export_capture`] - Writes a packet log against a network's interfaces

mod writer;

pub use writer::{
    block_type, export_capture, option_code, Block, BlockOption, CaptureWriter, BYTE_ORDER_MAGIC,
    LINKTYPE_ETHERNET,
};
