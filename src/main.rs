//! netsim CLI entry point.

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use netsim::cli::{simulate, Args, OutputFormatter};
use netsim::netsim_core::protocol::{default_layers, Protocol};
use netsim::netsim_core::{export_capture, Network};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    // Handle info-only commands
    if args.is_info_only() {
        list_protocols();
        return Ok(());
    }

    let session = simulate(&args)?;

    let formatter = OutputFormatter::new(args.format).with_tree(args.tree);
    let mut stdout = io::stdout().lock();
    formatter
        .write(session.log.packets(), &mut stdout)
        .context("Failed to write packets")?;

    if let Some(path) = &args.output {
        let capture = export_capture(&session.network, session.log.packets(), session.network.config())
            .context("Failed to build capture")?;
        std::fs::write(path, &capture)
            .with_context(|| format!("Failed to write capture: {}", path.display()))?;
        eprintln!(
            "Wrote {} packets to {}",
            session.log.len(),
            path.display()
        );
    }

    if let Some(path) = &args.save {
        save_topology(&session.network, path)?;
    }

    Ok(())
}

fn save_topology(network: &Network, path: &std::path::Path) -> Result<()> {
    network
        .save(path)
        .with_context(|| format!("Failed to save topology: {}", path.display()))?;
    eprintln!("Saved {} devices to {}", network.devices().len(), path.display());
    Ok(())
}

fn list_protocols() {
    let layers = default_layers();

    println!("Built-in Protocols:");
    println!("{:-<50}", "");

    for protocol in layers.all_protocols() {
        println!("  {} ({})", protocol.display_name(), protocol.name());

        let children = layers.children(protocol.name());
        if !children.is_empty() {
            println!("    -> Can identify: {}", children.join(", "));
        }

        let fields = protocol.fields().len() + protocol.post_fields().len();
        if fields > 0 {
            println!("    Fields: {fields}");
        }
    }
}
