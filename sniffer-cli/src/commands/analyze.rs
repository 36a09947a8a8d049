use crate::commands::stats::write_table;
use crate::InputOptions;
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use sniffer_core::analysis::analyze_batch_with_progress;
use sniffer_core::{AnalysisConfig, ByteStream, CaptureReport};
use std::fs;
use std::io::Write;
use tracing::{info, warn};

/// Arguments of `serialsniffer analyze`
#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Capture files to analyse in parallel
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<String>,

    /// Write all reports as JSON to this file
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Serialize)]
struct InputReport<'a> {
    input: &'a str,
    #[serde(flatten)]
    report: &'a CaptureReport,
}

pub fn execute(args: &AnalyzeArgs, input: &InputOptions, out: &mut dyn Write) -> Result<()> {
    let streams: Vec<ByteStream> = args
        .inputs
        .iter()
        .map(|path| input.load(path))
        .collect::<Result<_>>()?;

    info!("Analysing {} captures", streams.len());

    let progress = if streams.len() > 1 {
        let pb = ProgressBar::new(streams.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} captures")
                .context("Invalid progress template")?
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let results = analyze_batch_with_progress(&streams, &AnalysisConfig::default(), |_| progress.inc(1));
    progress.finish_and_clear();

    let reports: Vec<CaptureReport> = results
        .into_iter()
        .zip(&args.inputs)
        .map(|(result, path)| result.with_context(|| format!("Analysis failed: {}", path)))
        .collect::<Result<_>>()?;

    for (path, report) in args.inputs.iter().zip(&reports) {
        writeln!(out, "\n=== {} ===", path)?;
        write_table(&report.statistics, out)?;

        match &report.detected_checksum {
            Some(kind) => writeln!(out, "{} Checksum: {}", "✓".green(), kind)?,
            None => writeln!(out, "{} Checksum: none detected", "·".normal())?,
        }
        if let Some(pattern) = &report.sync_pattern {
            writeln!(
                out,
                "{} Sync pattern: {} ({:.0}% of packets)",
                "✓".green(),
                pattern.to_hex(),
                pattern.coverage * 100.0
            )?;
        }
        for warning in &report.warnings {
            warn!("{}: {}", path, warning);
            writeln!(out, "{} {}", "!".yellow(), warning)?;
        }
    }

    if let Some(output_path) = &args.output {
        let entries: Vec<InputReport> = args
            .inputs
            .iter()
            .zip(&reports)
            .map(|(input, report)| InputReport { input, report })
            .collect();
        let json = serde_json::to_string_pretty(&entries).with_context(|| "Failed to serialize reports")?;
        fs::write(output_path, json).with_context(|| format!("Failed to write output file: {}", output_path))?;
        info!("Reports written to: {}", output_path);
    }

    Ok(())
}
