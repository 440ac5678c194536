//! Output formatting for observed packets.
//!
//! Packets print one row each with the columns of a capture viewer's packet
//! list, in table, CSV, or JSON Lines format. Dissection trees can be
//! appended on request.

use std::io::Write;

use clap::ValueEnum;
use netsim_core::AnalyzedPacket;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table (default)
    Table,
    /// Comma-separated values
    Csv,
    /// JSON Lines (one JSON object per packet)
    Json,
}

const COLUMNS: [&str; 10] = [
    "No.",
    "Time",
    "Device",
    "Interface",
    "Dir",
    "Source",
    "Destination",
    "Protocol",
    "Length",
    "Info",
];

/// Formats packet lists for output.
pub struct OutputFormatter {
    format: OutputFormat,
    tree: bool,
}

impl OutputFormatter {
    /// Create a new formatter with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            tree: false,
        }
    }

    /// Also emit each packet's dissection tree.
    pub fn with_tree(mut self, tree: bool) -> Self {
        self.tree = tree;
        self
    }

    /// Format the packets and write them to the given writer.
    pub fn write<W: Write>(&self, packets: &[AnalyzedPacket], writer: &mut W) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Table => self.write_table(packets, writer),
            OutputFormat::Csv => self.write_csv(packets, writer),
            OutputFormat::Json => self.write_json(packets, writer),
        }
    }

    fn row(packet: &AnalyzedPacket) -> [String; 10] {
        [
            packet.id().to_string(),
            packet.time().to_string(),
            packet.device().to_string(),
            packet.interface().to_string(),
            packet.direction().as_str().to_string(),
            packet.source().unwrap_or_default().to_string(),
            packet.destination().unwrap_or_default().to_string(),
            packet.protocol().unwrap_or_default().to_string(),
            packet.data().len().to_string(),
            packet.info().unwrap_or_default().to_string(),
        ]
    }

    fn write_table<W: Write>(&self, packets: &[AnalyzedPacket], writer: &mut W) -> std::io::Result<()> {
        use comfy_table::{Cell, Table};

        let mut table = Table::new();
        table.set_header(COLUMNS.iter().map(Cell::new).collect::<Vec<_>>());
        for packet in packets {
            table.add_row(Self::row(packet).into_iter().map(Cell::new).collect::<Vec<_>>());
        }
        writeln!(writer, "{table}")?;

        if self.tree {
            for packet in packets {
                writeln!(writer)?;
                write!(writer, "{}", packet.tree().render())?;
            }
        }
        Ok(())
    }

    fn write_csv<W: Write>(&self, packets: &[AnalyzedPacket], writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", COLUMNS.join(","))?;

        for packet in packets {
            let values: Vec<String> = Self::row(packet)
                .into_iter()
                .map(|value| {
                    // Escape commas and quotes
                    if value.contains(',') || value.contains('"') || value.contains('\n') {
                        format!("\"{}\"", value.replace('"', "\"\""))
                    } else {
                        value
                    }
                })
                .collect();
            writeln!(writer, "{}", values.join(","))?;
        }

        Ok(())
    }

    fn write_json<W: Write>(&self, packets: &[AnalyzedPacket], writer: &mut W) -> std::io::Result<()> {
        for packet in packets {
            let mut value = serde_json::to_value(packet)?;
            if !self.tree {
                if let serde_json::Value::Object(obj) = &mut value {
                    obj.remove("tree");
                }
            }
            writeln!(writer, "{value}")?;
        }

        Ok(())
    }
}
