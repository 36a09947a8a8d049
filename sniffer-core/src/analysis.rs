//! End-to-end capture analysis
//!
//! Ties the inferencer, the checksum scanner, framing detection and the
//! statistics aggregator together. Independent captures are analysed on
//! separate threads; each run owns its stream and shares nothing mutable.

use crate::boundary::{BoundaryInferencer, InferenceParams};
use crate::checksum::{ChecksumKind, ChecksumScanner, KindSummary};
use crate::framing::{detect_sync_pattern, measure_sync_pattern, SyncPattern};
use crate::stats::{compute_statistics, CaptureStatistics, StatsConfig};
use crate::types::{ByteStream, PacketSequence};
use crate::Result;
use serde::Serialize;
use std::thread;

#[cfg(feature = "logging")]
use tracing::{info, warn};

/// Settings for a full analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Boundary inference parameters
    pub inference: InferenceParams,
    /// Statistics parameters
    pub stats: StatsConfig,
    /// Also count checksum matches per kind over the whole stream
    pub checksum_summary: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            inference: InferenceParams::default(),
            stats: StatsConfig::default(),
            checksum_summary: true,
        }
    }
}

impl AnalysisConfig {
    /// Use `params` for inference
    pub fn inference(mut self, params: InferenceParams) -> Self {
        self.inference = params;
        self
    }

    /// Use `stats` for statistics
    pub fn stats(mut self, stats: StatsConfig) -> Self {
        self.stats = stats;
        self
    }

    /// Toggle the per-kind checksum summary
    pub fn checksum_summary(mut self, enabled: bool) -> Self {
        self.checksum_summary = enabled;
        self
    }
}

/// Everything learned about one capture
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CaptureReport {
    /// Aggregate figures
    pub statistics: CaptureStatistics,
    /// Inferred packets
    pub packets: PacketSequence,
    /// Gap threshold applied, in nanoseconds
    pub gap_threshold_ns: u64,
    /// Checksum used to confirm packets
    pub detected_checksum: Option<ChecksumKind>,
    /// Matches per checksum kind over the whole stream
    pub checksum_summary: Vec<KindSummary>,
    /// Common packet prefix
    pub sync_pattern: Option<SyncPattern>,
    /// Conditions that emptied the results without failing the run
    pub warnings: Vec<String>,
}

/// Analyse one stream
///
/// A stream too short to segment yields an empty report carrying a warning.
pub fn analyze_stream(stream: &ByteStream, config: &AnalysisConfig) -> Result<CaptureReport> {
    let inferencer = BoundaryInferencer::new(config.inference.clone())?;

    let inference = match inferencer.infer(stream) {
        Ok(inference) => inference,
        Err(e) if e.is_warning() => {
            #[cfg(feature = "logging")]
            warn!("{}", e);
            return Ok(CaptureReport {
                warnings: vec![e.to_string()],
                ..Default::default()
            });
        }
        Err(e) => return Err(e),
    };

    let data: &[u8] = stream.data();
    let checksum_summary = if config.checksum_summary {
        ChecksumScanner::new(config.inference.scan.clone())?
            .scan(data)
            .summary()
    } else {
        Vec::new()
    };

    let sync_pattern = match &config.inference.sync_pattern {
        Some(pattern) => Some(measure_sync_pattern(data, &inference.packets, pattern)),
        None => detect_sync_pattern(data, &inference.packets),
    };
    let statistics = compute_statistics(&inference.packets, stream, &config.stats);

    #[cfg(feature = "logging")]
    info!(
        "Analysed {} bytes: {} packets, baud {}",
        statistics.total_bytes, statistics.total_packets, statistics.baud_rate
    );

    Ok(CaptureReport {
        statistics,
        packets: inference.packets,
        gap_threshold_ns: inference.gap_threshold_ns,
        detected_checksum: inference.checksum,
        checksum_summary,
        sync_pattern,
        warnings: Vec::new(),
    })
}

/// Analyse independent streams in parallel, preserving input order
pub fn analyze_batch(streams: &[ByteStream], config: &AnalysisConfig) -> Vec<Result<CaptureReport>> {
    analyze_batch_with_progress(streams, config, |_| {})
}

/// Like [`analyze_batch`], calling `on_done` with each input index as it
/// finishes
///
/// At most [`thread::available_parallelism`] streams are analysed at once.
pub fn analyze_batch_with_progress<F>(
    streams: &[ByteStream],
    config: &AnalysisConfig,
    on_done: F,
) -> Vec<Result<CaptureReport>>
where
    F: Fn(usize) + Sync,
{
    let workers = thread::available_parallelism().map_or(1, |n| n.get());
    let on_done = &on_done;
    let mut reports = Vec::with_capacity(streams.len());

    for (chunk_index, chunk) in streams.chunks(workers).enumerate() {
        let offset = chunk_index * workers;
        thread::scope(|s| {
            let handles: Vec<_> = chunk
                .iter()
                .enumerate()
                .map(|(i, stream)| {
                    s.spawn(move || {
                        let report = analyze_stream(stream, config);
                        on_done(offset + i);
                        report
                    })
                })
                .collect();

            reports.extend(
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e))),
            );
        });
    }

    reports
}
