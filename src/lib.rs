//! netsim - Simulate Ethernet networks and inspect the traffic.
//!
//! The simulation engine lives in [`netsim_core`]; this crate adds the
//! command-line front end that loads or builds a topology, injects traffic,
//! runs the clock and prints or exports what was observed.
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use netsim::cli::{simulate, Args, OutputFormat, OutputFormatter};
//!
//! fn main() -> anyhow::Result<()> {
//!     let args = Args::parse_from(["netsim", "--demo", "--ping", "h1:10.0.0.2"]);
//!     let session = simulate(&args)?;
//!     OutputFormatter::new(OutputFormat::Table).write(session.log.packets(), &mut std::io::stdout())?;
//!     Ok(())
//! }
//! ```

pub mod cli;

pub use netsim_core;
