use crate::commands::packets::infer_or_empty;
use crate::InputOptions;
use anyhow::{Context, Result};
use sniffer_core::{compute_statistics, BoundaryInferencer, CaptureStatistics, InferenceParams, StatsConfig};
use std::io::Write;
use tracing::info;

/// Arguments of `serialsniffer stats`
#[derive(clap::Args, Debug, Clone)]
pub struct StatsArgs {
    /// Capture file to summarise
    pub input: String,

    /// Line bits per data byte, start and stop bits included
    #[arg(long, default_value_t = 10)]
    pub bits_per_byte: u32,

    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsArgs {
    /// Arguments for summarising `input` with defaults
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            bits_per_byte: 10,
            json: false,
        }
    }
}

pub fn execute(args: &StatsArgs, input: &InputOptions, out: &mut dyn Write) -> Result<()> {
    let stream = input.load(&args.input)?;
    let inferencer = BoundaryInferencer::new(InferenceParams::default())?;
    let inference = infer_or_empty(&inferencer, &stream)?;

    let config = StatsConfig::default().bits_per_byte(args.bits_per_byte);
    let stats = compute_statistics(&inference.packets, &stream, &config);
    info!("Computed statistics for {} packets", stats.total_packets);

    if args.json {
        let json = serde_json::to_string_pretty(&stats).with_context(|| "Failed to serialize statistics")?;
        writeln!(out, "{}", json)?;
        return Ok(());
    }

    write_table(&stats, out)?;

    writeln!(out)?;
    writeln!(out, "Confirmed packets: {}", stats.confirmed_packets)?;
    writeln!(
        out,
        "Packet length:     min {} / max {} / mean {:.1}",
        stats.min_packet_len, stats.max_packet_len, stats.mean_packet_len
    )?;
    writeln!(out, "Mean confidence:   {:.2}", stats.mean_confidence)?;
    writeln!(out, "Bytes outside packets: {}", stats.gap_bytes)?;

    Ok(())
}

/// Render the four headline figures as a table
pub fn write_table(stats: &CaptureStatistics, out: &mut dyn Write) -> Result<()> {
    let headers = ["Total Bytes", "Total Packets", "Baud Rate", "Duration"];
    let values = [
        stats.total_bytes.to_string(),
        stats.total_packets.to_string(),
        stats.baud_rate.to_string(),
        stats.duration_display(),
    ];

    let widths: Vec<usize> = headers
        .iter()
        .zip(&values)
        .map(|(h, v)| h.chars().count().max(v.chars().count()))
        .collect();

    let rule: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+";

    let row = |cells: &[&str]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("| {:<w$} ", c, w = *w))
            .collect::<String>()
            + "|"
    };

    writeln!(out, "{}", rule)?;
    writeln!(out, "{}", row(&headers))?;
    writeln!(out, "{}", rule)?;
    let value_refs: Vec<&str> = values.iter().map(String::as_str).collect();
    writeln!(out, "{}", row(&value_refs))?;
    writeln!(out, "{}", rule)?;

    Ok(())
}
