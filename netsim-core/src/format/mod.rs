//! Address types and formatting utilities.

mod address;

pub use address::{format_hex, format_ipv4, format_mac, parse_ipv4, parse_mac, MacAddr};
