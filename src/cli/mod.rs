//! CLI components.

mod args;
mod output;
mod scenario;

pub use args::{Args, Injection, PingRequest};
pub use output::{OutputFormat, OutputFormatter};
pub use scenario::{demo_network, inject, simulate, Session, INJECTED_PAYLOAD_LEN};
