use crate::{hex_preview, parse_hex_u16, AlgorithmArg, InputOptions};
use anyhow::{bail, Context, Result};
use colored::*;
use serde::Serialize;
use sniffer_core::checksum::KindSummary;
use sniffer_core::{ChecksumAlgorithm, ChecksumCandidate, ChecksumScanner, CrcParams, ScanConfig};
use std::fs;
use std::io::Write;
use tracing::info;

/// Arguments of `serialsniffer checksum`
#[derive(clap::Args, Debug, Clone)]
pub struct ChecksumArgs {
    /// Capture file to scan
    pub input: String,

    /// Only test this algorithm
    #[arg(short, long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// CRC polynomial in hex (needs --algorithm crc8 or crc16)
    #[arg(long, value_parser = parse_hex_u16, requires = "algorithm")]
    pub poly: Option<u16>,

    /// CRC initial value in hex
    #[arg(long, value_parser = parse_hex_u16, default_value = "0", requires = "poly")]
    pub init: u16,

    /// Process CRC bits LSB-first
    #[arg(long, requires = "poly")]
    pub reflect: bool,

    /// Shortest window (payload + checksum)
    #[arg(long, default_value_t = 2)]
    pub min_window: usize,

    /// Longest window (payload + checksum)
    #[arg(long, default_value_t = 64)]
    pub max_window: usize,

    /// Show at most this many matches
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,

    /// Write matches as JSON to this file
    #[arg(short, long)]
    pub output: Option<String>,
}

impl ChecksumArgs {
    /// Arguments for scanning `input` with defaults
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            algorithm: None,
            poly: None,
            init: 0,
            reflect: false,
            min_window: 2,
            max_window: 64,
            limit: 20,
            output: None,
        }
    }

    fn scan_config(&self) -> Result<ScanConfig> {
        let mut config = ScanConfig::default().windows(self.min_window, self.max_window);

        if let Some(algorithm) = self.algorithm {
            config = config.algorithm(algorithm.into());
        }

        if let Some(poly) = self.poly {
            let params = match self.algorithm.map(ChecksumAlgorithm::from) {
                Some(ChecksumAlgorithm::Crc8) => CrcParams::crc8(poly, self.init),
                Some(ChecksumAlgorithm::Crc16) => CrcParams::crc16(poly, self.init),
                _ => bail!("--poly only applies to --algorithm crc8 or crc16"),
            };
            let params = if self.reflect { params.reflected() } else { params };
            config = config.crc_params(params);
        }

        Ok(config)
    }
}

#[derive(Serialize)]
struct ChecksumReport<'a> {
    input: &'a str,
    bytes_scanned: usize,
    total_matches: usize,
    summary: Vec<KindSummary>,
    matches: Vec<MatchRecord>,
}

#[derive(Serialize)]
struct MatchRecord {
    #[serde(flatten)]
    candidate: ChecksumCandidate,
    confidence: f64,
    bytes: String,
}

pub fn execute(args: &ChecksumArgs, input: &InputOptions, out: &mut dyn Write) -> Result<()> {
    let config = args.scan_config()?;
    let scanner = ChecksumScanner::new(config).context("Invalid checksum parameters")?;
    let stream = input.load(&args.input)?;

    info!("Scanning {} bytes with {} checksum kinds", stream.len(), scanner.kinds().len());

    let candidates = scanner.scan(stream.data());
    let summary = candidates.summary();

    writeln!(out, "\n=== Checksum Scan ===")?;
    writeln!(out, "Bytes scanned:     {}", stream.len())?;
    writeln!(out, "Kinds tested:      {}", scanner.kinds().len())?;
    writeln!(out, "Matches:           {}", candidates.len())?;

    writeln!(out, "\n=== Matches per Kind ===")?;
    for entry in &summary {
        let count = if entry.matches > 0 {
            entry.matches.to_string().green()
        } else {
            entry.matches.to_string().normal()
        };
        write!(out, "{:<40} {}", entry.kind.to_string(), count)?;
        if entry.ambiguous > 0 {
            write!(out, " ({} ambiguous)", entry.ambiguous)?;
        }
        writeln!(out)?;
    }

    if candidates.is_empty() {
        writeln!(out, "\n{} No checksum matches", "✗".red())?;
    } else {
        writeln!(out, "\n=== Top Matches ===")?;
        for c in candidates.iter().take(args.limit) {
            let marker = if c.ambiguous { "?".yellow() } else { "✓".green() };
            writeln!(
                out,
                "{} [{:>6}, {:>6}) len {:>3}  {:<40} {}",
                marker,
                c.start,
                c.end,
                c.len(),
                c.kind.to_string(),
                hex_preview(&stream.data()[c.start..c.end], 16)
            )?;
        }
        if candidates.len() > args.limit {
            writeln!(out, "... {} more", candidates.len() - args.limit)?;
        }
    }

    if let Some(output_path) = &args.output {
        let report = ChecksumReport {
            input: &args.input,
            bytes_scanned: stream.len(),
            total_matches: candidates.len(),
            summary,
            matches: candidates
                .iter()
                .take(args.limit)
                .map(|c| MatchRecord {
                    candidate: *c,
                    confidence: c.confidence(),
                    bytes: hex::encode(&stream.data()[c.start..c.end]),
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&report).with_context(|| "Failed to serialize checksum matches")?;
        fs::write(output_path, json).with_context(|| format!("Failed to write output file: {}", output_path))?;
        info!("Checksum matches written to: {}", output_path);
    }

    Ok(())
}
