//! Dissection results.
//!
//! - [`AnalysisTree`]: byte ranges labelled while dissecting a packet
//! - [`AnalyzedPacket`]: one observed frame with its summary and tree
//! - [`PacketLog`]: collects analyzed packets from a running network

mod log;
mod packet;
mod tree;

pub use log::PacketLog;
pub use packet::{AnalyzedPacket, Summary};
pub use tree::{AnalysisItem, AnalysisNode, AnalysisTree, TreeLine};
