use crate::{hex_preview, parse_hex_bytes, AlgorithmArg, InputOptions};
use anyhow::{bail, Context, Result};
use colored::*;
use sniffer_core::{BoundaryInferencer, ByteStream, Inference, InferenceParams, PacketSequence, ScanConfig};
use std::fs;
use std::io::Write;
use std::time::Duration;
use tracing::{info, warn};

/// Arguments of `serialsniffer packets`
#[derive(clap::Args, Debug, Clone)]
pub struct PacketsArgs {
    /// Capture file to segment
    pub input: String,

    /// Fixed gap threshold in milliseconds (default: multiple of the median gap)
    #[arg(long)]
    pub gap_ms: Option<f64>,

    /// Multiple of the median inter-byte gap treated as a boundary
    #[arg(long, default_value_t = 3.0)]
    pub gap_multiplier: f64,

    /// Checksum algorithm the device uses
    #[arg(short, long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Sync pattern in hex that starts every packet (e.g. AA55)
    #[arg(long, value_parser = parse_hex_bytes)]
    pub sync: Option<Vec<u8>>,

    /// Write packets as JSON to this file
    #[arg(short, long)]
    pub output: Option<String>,
}

impl PacketsArgs {
    /// Arguments for segmenting `input` with defaults
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            gap_ms: None,
            gap_multiplier: 3.0,
            algorithm: None,
            sync: None,
            output: None,
        }
    }

    /// Inference parameters for these arguments
    pub fn inference_params(&self) -> Result<InferenceParams> {
        let mut params = InferenceParams::default().gap_multiplier(self.gap_multiplier);

        if let Some(ms) = self.gap_ms {
            if !ms.is_finite() || ms < 0.0 {
                bail!("--gap-ms must be a non-negative number, got {}", ms);
            }
            let threshold = Duration::try_from_secs_f64(ms / 1000.0)
                .with_context(|| format!("--gap-ms {} is out of range", ms))?;
            params = params.gap_threshold(threshold);
        }
        if let Some(algorithm) = self.algorithm {
            params = params.scan(ScanConfig::default().parallel(false).algorithm(algorithm.into()));
        }
        if let Some(sync) = &self.sync {
            params = params.sync_pattern(sync.clone());
        }

        Ok(params)
    }
}

/// Infer packets, turning a too-short stream into an empty result
pub(crate) fn infer_or_empty(inferencer: &BoundaryInferencer, stream: &ByteStream) -> Result<Inference> {
    match inferencer.infer(stream) {
        Ok(inference) => Ok(inference),
        Err(e) if e.is_warning() => {
            warn!("{}", e);
            Ok(Inference {
                packets: PacketSequence::empty(),
                gap_threshold_ns: 0,
                timing_boundaries: 0,
                checksum: None,
            })
        }
        Err(e) => Err(e).context("Packet inference failed"),
    }
}

pub fn execute(args: &PacketsArgs, input: &InputOptions, out: &mut dyn Write) -> Result<()> {
    let inferencer = BoundaryInferencer::new(args.inference_params()?).context("Invalid inference parameters")?;
    let stream = input.load(&args.input)?;

    let inference = infer_or_empty(&inferencer, &stream)?;
    let packets = &inference.packets;
    let confirmed = packets.iter().filter(|p| p.is_confirmed()).count();

    info!("Inferred {} packets ({} confirmed)", packets.len(), confirmed);

    writeln!(out, "\n=== Packet Inference ===")?;
    writeln!(out, "Bytes:             {}", stream.len())?;
    writeln!(
        out,
        "Gap threshold:     {:.3} ms",
        inference.gap_threshold_ns as f64 / 1_000_000.0
    )?;
    writeln!(out, "Timing boundaries: {}", inference.timing_boundaries)?;
    match &inference.checksum {
        Some(kind) => writeln!(out, "Checksum:          {}", kind)?,
        None => writeln!(out, "Checksum:          none")?,
    }
    writeln!(out, "Packets:           {} ({} confirmed)", packets.len(), confirmed)?;

    if packets.is_empty() {
        writeln!(out, "\n{} No packets inferred", "✗".red())?;
    } else {
        writeln!(out, "\n=== Packets ===")?;
        for (i, packet) in packets.iter().enumerate() {
            let marker = if packet.is_confirmed() { "✓".green() } else { "·".normal() };
            writeln!(
                out,
                "{} #{:<4} [{:>6}, {:>6}) len {:>3}  conf {:.2}  {:<11} {}",
                marker,
                i,
                packet.start,
                packet.end,
                packet.len(),
                packet.confidence,
                packet.signal,
                hex_preview(&stream.data()[packet.range()], 16)
            )?;
        }
    }

    if let Some(output_path) = &args.output {
        let json = serde_json::to_string_pretty(&inference).with_context(|| "Failed to serialize packets")?;
        fs::write(output_path, json).with_context(|| format!("Failed to write output file: {}", output_path))?;
        info!("Packets written to: {}", output_path);
    }

    Ok(())
}
