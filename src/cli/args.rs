//! Command-line argument definitions.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use netsim_core::{parse_ipv4, SimulationConfig};

use super::OutputFormat;

/// A frame to inject before the clock starts: `SRC:DST` device names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub source: String,
    pub destination: String,
}

impl FromStr for Injection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((source, destination)) if !source.is_empty() && !destination.is_empty() => {
                Ok(Self {
                    source: source.to_string(),
                    destination: destination.to_string(),
                })
            }
            _ => Err(format!("expected SRC:DST, got '{s}'")),
        }
    }
}

/// A ping to issue before the clock starts: `HOST:IPV4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingRequest {
    pub source: String,
    pub target: Ipv4Addr,
}

impl FromStr for PingRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, target) = s
            .split_once(':')
            .filter(|(source, _)| !source.is_empty())
            .ok_or_else(|| format!("expected HOST:IPV4, got '{s}'"))?;
        let target = parse_ipv4(target).map_err(|e| e.to_string())?;
        Ok(Self {
            source: source.to_string(),
            target,
        })
    }
}

/// Simulate Ethernet networks of hosts, hubs and switches.
#[derive(Parser, Debug)]
#[command(name = "netsim")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Topology file (JSON) to simulate
    #[arg(value_name = "TOPOLOGY")]
    pub topology: Option<PathBuf>,

    /// Simulate a built-in three-host switched network instead of a file
    #[arg(long = "demo", conflicts_with = "topology")]
    pub demo: bool,

    /// Number of clock ticks to run
    #[arg(short = 't', long = "ticks", default_value = "10")]
    pub ticks: u64,

    /// Inject a raw frame from SRC's first interface to DST's first interface
    #[arg(long = "send", value_name = "SRC:DST")]
    pub send: Vec<Injection>,

    /// Ping an IPv4 address from a host
    #[arg(long = "ping", value_name = "HOST:IPV4")]
    pub ping: Vec<PingRequest>,

    /// Output format for stdout
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Print the dissection tree of every packet
    #[arg(long = "tree")]
    pub tree: bool,

    /// Write observed packets to a PCAPNG capture
    #[arg(short = 'o', long = "output", value_name = "CAPTURE_FILE")]
    pub output: Option<PathBuf>,

    /// Save the topology after the run
    #[arg(long = "save", value_name = "TOPOLOGY_FILE")]
    pub save: Option<PathBuf>,

    /// List built-in protocols
    #[arg(long = "list-protocols")]
    pub list_protocols: bool,

    /// Wall-clock length of one tick in capture timestamps
    #[arg(long = "tick-micros", default_value = "1000000")]
    pub tick_micros: u64,

    /// Maximum bytes stored per captured packet
    #[arg(long = "snaplen", default_value = "65535")]
    pub snaplen: u32,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Check if this is an info-only command (no network needed).
    pub fn is_info_only(&self) -> bool {
        self.list_protocols
    }

    /// Simulation settings assembled from the flags.
    pub fn config(&self) -> SimulationConfig {
        SimulationConfig::default()
            .with_tick_micros(self.tick_micros)
            .with_snaplen(self.snaplen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_injection() {
        let injection: Injection = "h1:h2".parse().unwrap();
        assert_eq!(injection.source, "h1");
        assert_eq!(injection.destination, "h2");
        assert!("h1".parse::<Injection>().is_err());
        assert!(":h2".parse::<Injection>().is_err());
    }

    #[test]
    fn test_parse_ping() {
        let ping: PingRequest = "h1:10.0.0.2".parse().unwrap();
        assert_eq!(ping.source, "h1");
        assert_eq!(ping.target, Ipv4Addr::new(10, 0, 0, 2));
        assert!("h1:10.0.0".parse::<PingRequest>().is_err());
        assert!("10.0.0.2".parse::<PingRequest>().is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "netsim", "--demo", "--ticks", "4", "--send", "h1:h2", "--ping", "h1:10.0.0.3",
            "--format", "json", "-vv",
        ]);
        assert!(args.demo);
        assert_eq!(args.ticks, 4);
        assert_eq!(args.send.len(), 1);
        assert_eq!(args.ping[0].target, Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.config().tick_micros, 1_000_000);
    }

    #[test]
    fn test_demo_conflicts_with_topology() {
        assert!(Args::try_parse_from(["netsim", "--demo", "net.json"]).is_err());
    }
}
