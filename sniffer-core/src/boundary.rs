//! Packet boundary inference
//!
//! Two independent signals segment a stream:
//!
//! 1. **Timing**: an inter-byte gap above a threshold (by default three
//!    times the median gap) starts a new packet.
//! 2. **Checksum**: inside each timing segment, windows validated by the
//!    device's checksum confirm packet ends.
//!
//! The stream is first cut at timing boundaries. Each segment is then
//! covered by the checksum windows that confirm the most bytes; bytes no
//! window explains become unconfirmed packets. A checksum window may end
//! up to one byte before or after a timing boundary, in which case the
//! checksum boundary replaces the timing one.
//!
//! Segments are processed strictly in order because a segment's start can
//! move when the previous one was closed by a checksum.

use crate::checksum::{validate_window, ChecksumCandidate, ChecksumKind, ChecksumScanner, ScanConfig};
use crate::constants::{
    BOUNDARY_TOLERANCE, DEFAULT_GAP_MULTIPLIER, MIN_DETECTED_SEGMENTS,
    MIN_INFERENCE_BYTES, OUTLIER_SIGMA, TIMING_CONFIDENCE, UNDELIMITED_CONFIDENCE,
};
use crate::error::AnalysisError;
use crate::timing::{gap_threshold_ns, timing_boundaries};
use crate::types::{ByteStream, Packet, PacketSequence, PacketSignal};
use crate::Result;
use serde::Serialize;
use std::time::Duration;

#[cfg(feature = "logging")]
use tracing::debug;

/// Parameters for one inference pass
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceParams {
    /// Fixed gap threshold; `None` derives it from the median gap
    pub gap_threshold: Option<Duration>,

    /// Multiple of the median gap used when no fixed threshold is set
    pub gap_multiplier: f64,

    /// Checksum the device is known to use
    pub checksum: Option<ChecksumKind>,

    /// Try to identify the checksum from whole timing segments
    pub auto_detect_checksum: bool,

    /// Framing bytes that start every packet
    pub sync_pattern: Option<Vec<u8>>,

    /// Kinds and window bounds for checksum matching
    pub scan: ScanConfig,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            gap_threshold: None,
            gap_multiplier: DEFAULT_GAP_MULTIPLIER,
            checksum: None,
            auto_detect_checksum: true,
            sync_pattern: None,
            scan: ScanConfig::default().parallel(false),
        }
    }
}

impl InferenceParams {
    /// Use a fixed gap threshold
    pub fn gap_threshold(mut self, threshold: Duration) -> Self {
        self.gap_threshold = Some(threshold);
        self
    }

    /// Scale the median gap by `multiplier`
    pub fn gap_multiplier(mut self, multiplier: f64) -> Self {
        self.gap_multiplier = multiplier;
        self
    }

    /// Use `kind` as the checksum signal
    pub fn checksum(mut self, kind: ChecksumKind) -> Self {
        self.checksum = Some(kind);
        self
    }

    /// Toggle checksum auto-detection
    pub fn auto_detect(mut self, enabled: bool) -> Self {
        self.auto_detect_checksum = enabled;
        self
    }

    /// Split unconfirmed spans at `pattern`
    pub fn sync_pattern(mut self, pattern: Vec<u8>) -> Self {
        self.sync_pattern = Some(pattern);
        self
    }

    /// Checksum scan settings
    pub fn scan(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }
}

/// Result of one inference pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inference {
    /// Inferred packets
    pub packets: PacketSequence,

    /// Gap threshold applied, in nanoseconds
    pub gap_threshold_ns: u64,

    /// Number of timing boundaries found
    pub timing_boundaries: usize,

    /// Checksum used as the second signal
    pub checksum: Option<ChecksumKind>,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: usize,
    end: usize,
    stream_len: usize,
    opened_by_timing: bool,
}

impl Segment {
    fn closed_by_timing(&self) -> bool {
        self.end < self.stream_len
    }

    /// A window ending here closes the segment
    fn is_terminal(&self, end: usize) -> bool {
        if self.closed_by_timing() {
            end + BOUNDARY_TOLERANCE >= self.end
        } else {
            end == self.end
        }
    }

    /// Furthest a window may reach
    fn limit(&self) -> usize {
        if self.closed_by_timing() {
            (self.end + BOUNDARY_TOLERANCE).min(self.stream_len)
        } else {
            self.end
        }
    }
}

/// Confirmed windows for one segment and where the next segment starts
struct SegmentPlan {
    windows: Vec<ChecksumCandidate>,
    next: usize,
}

/// Sequential packet boundary inferencer
#[derive(Debug, Clone)]
pub struct BoundaryInferencer {
    params: InferenceParams,
    scanner: ChecksumScanner,
}

impl BoundaryInferencer {
    /// Validate `params` and build an inferencer
    pub fn new(params: InferenceParams) -> Result<Self> {
        if !(params.gap_multiplier.is_finite() && params.gap_multiplier > 0.0) {
            return Err(AnalysisError::invalid_parameter(
                "gap_multiplier",
                format!("{} is not a positive number", params.gap_multiplier),
            ));
        }
        if params.sync_pattern.as_ref().is_some_and(|p| p.is_empty()) {
            return Err(AnalysisError::invalid_parameter("sync_pattern", "pattern is empty"));
        }
        if let Some(kind) = &params.checksum {
            kind.validate()?;
        }
        let scanner = ChecksumScanner::new(params.scan.clone())?;
        Ok(Self { params, scanner })
    }

    /// Parameters in use
    pub fn params(&self) -> &InferenceParams {
        &self.params
    }

    /// Segment `stream` into packets
    pub fn infer(&self, stream: &ByteStream) -> Result<Inference> {
        let n = stream.len();
        if n < MIN_INFERENCE_BYTES {
            return Err(AnalysisError::InsufficientData {
                needed: MIN_INFERENCE_BYTES,
                actual: n,
            });
        }

        let data: &[u8] = stream.data();
        let gaps = stream.gaps();
        let threshold = match self.params.gap_threshold {
            Some(t) => u64::try_from(t.as_nanos()).unwrap_or(u64::MAX),
            None => gap_threshold_ns(&gaps, self.params.gap_multiplier),
        };
        let boundaries = timing_boundaries(&gaps, threshold);

        #[cfg(feature = "logging")]
        debug!(
            "Gap threshold {}ns, {} timing boundaries in {} bytes",
            threshold,
            boundaries.len(),
            n
        );

        let checksum = self.resolve_checksum(data, &boundaries);

        #[cfg(feature = "logging")]
        match &checksum {
            Some(kind) => debug!("Using checksum signal {}", kind),
            None => debug!("No checksum signal, timing only"),
        }

        let mut packets = self.assemble(data, &boundaries, checksum);
        scale_outliers(&mut packets);

        #[cfg(feature = "logging")]
        debug!(
            "Inferred {} packets ({} checksum-confirmed)",
            packets.len(),
            packets.iter().filter(|p| p.is_confirmed()).count()
        );

        Ok(Inference {
            packets: PacketSequence::new(packets)?,
            gap_threshold_ns: threshold,
            timing_boundaries: boundaries.len(),
            checksum,
        })
    }

    fn resolve_checksum(&self, data: &[u8], boundaries: &[usize]) -> Option<ChecksumKind> {
        if let Some(kind) = self.params.checksum {
            return Some(kind);
        }
        let kinds = self.scanner.kinds();
        if self.params.scan.algorithm.is_some() && kinds.len() == 1 {
            return Some(kinds[0]);
        }
        if !self.params.auto_detect_checksum {
            return None;
        }
        detect_checksum(kinds, data, &segments(boundaries, data.len()))
    }

    fn assemble(&self, data: &[u8], boundaries: &[usize], checksum: Option<ChecksumKind>) -> Vec<Packet> {
        let n = data.len();
        let mut seg_ends = boundaries.to_vec();
        seg_ends.push(n);

        let mut packets = Vec::new();
        let mut pos = 0;
        let mut bi = 0;

        while pos < n {
            while bi < seg_ends.len() && seg_ends[bi] <= pos {
                bi += 1;
            }
            let segment = Segment {
                start: pos,
                end: seg_ends.get(bi).copied().unwrap_or(n),
                stream_len: n,
                opened_by_timing: boundaries.binary_search(&pos).is_ok(),
            };

            pos = self.assemble_segment(data, segment, checksum, &mut packets);
            // The closing boundary is consumed even when a checksum moved it
            bi += 1;
        }

        packets
    }

    fn assemble_segment(
        &self,
        data: &[u8],
        segment: Segment,
        checksum: Option<ChecksumKind>,
        out: &mut Vec<Packet>,
    ) -> usize {
        let plan = match checksum {
            Some(kind) => self.plan_segment(kind, data, &segment),
            None => SegmentPlan {
                windows: Vec::new(),
                next: segment.end,
            },
        };

        let mut cursor = segment.start;
        let mut after_confirmed = out
            .last()
            .is_some_and(|p| p.is_confirmed() && p.end == segment.start);

        for window in plan.windows {
            if cursor < window.start {
                self.push_unconfirmed(data, &segment, cursor, window.start, after_confirmed, true, out);
            }
            cursor = window.end;
            after_confirmed = true;
            out.push(Packet {
                start: window.start,
                end: window.end,
                checksum: Some(window),
                confidence: window.confidence(),
                signal: PacketSignal::Checksum,
            });
        }

        if cursor < plan.next {
            self.push_unconfirmed(data, &segment, cursor, plan.next, after_confirmed, false, out);
        }

        plan.next
    }

    /// Cover `[segment.start, segment.end)` with the checksum windows that
    /// confirm the most bytes
    ///
    /// Equal coverage prefers a window over leaving a byte unconfirmed, and
    /// a shorter window over a longer one: back-to-back XOR or zero-seeded
    /// CRC frames also validate as one long frame.
    fn plan_segment(&self, kind: ChecksumKind, data: &[u8], segment: &Segment) -> SegmentPlan {
        let (s, e) = (segment.start, segment.end);
        let limit = segment.limit();
        let mut best = vec![0usize; e - s + 1];
        let mut choice: Vec<Option<usize>> = vec![None; e - s + 1];

        for p in (s..e).rev() {
            let i = p - s;
            let mut score = best[i + 1];
            let mut pick = None;

            for q in self.scanner.matching_ends(kind, data, p) {
                if q > limit {
                    break;
                }
                let tail = if segment.is_terminal(q) { 0 } else { best[q - s] };
                let total = (q - p) + tail;
                if total > score || (total == score && pick.is_none()) {
                    score = total;
                    pick = Some(q);
                }
            }

            best[i] = score;
            choice[i] = pick;
        }

        let mut windows = Vec::new();
        let mut next = e;
        let mut p = s;
        while p < e {
            match choice[p - s] {
                Some(q) => {
                    windows.push(ChecksumCandidate {
                        kind,
                        start: p,
                        end: q,
                        matched: true,
                        ambiguous: false,
                    });
                    if segment.is_terminal(q) {
                        next = q;
                        break;
                    }
                    p = q;
                }
                None => p += 1,
            }
        }

        SegmentPlan { windows, next }
    }

    /// Emit `[start, end)` as unconfirmed packets, split at sync occurrences
    #[allow(clippy::too_many_arguments)]
    fn push_unconfirmed(
        &self,
        data: &[u8],
        segment: &Segment,
        start: usize,
        end: usize,
        left_confirmed: bool,
        right_confirmed: bool,
        out: &mut Vec<Packet>,
    ) {
        let mut cuts = vec![start];
        if let Some(pattern) = &self.params.sync_pattern {
            cuts.extend(
                memchr::memmem::find_iter(&data[start..end], pattern)
                    .filter(|&off| off > 0)
                    .map(|off| start + off),
            );
        }
        cuts.push(end);

        for pair in cuts.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let timing = (a == segment.start && segment.opened_by_timing)
                || (b == segment.end && segment.closed_by_timing());
            let sync = a != start || b != end;
            let confirmed = (a == start && left_confirmed) || (b == end && right_confirmed);

            let signal = if timing {
                PacketSignal::Timing
            } else if sync {
                PacketSignal::Sync
            } else if confirmed {
                PacketSignal::Residual
            } else {
                PacketSignal::Undelimited
            };
            let confidence = if signal == PacketSignal::Undelimited {
                UNDELIMITED_CONFIDENCE
            } else {
                TIMING_CONFIDENCE
            };

            out.push(Packet {
                start: a,
                end: b,
                checksum: None,
                confidence,
                signal,
            });
        }
    }
}

/// Segment `[0, len)` at `boundaries`
pub fn segments(boundaries: &[usize], len: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0;
    for &b in boundaries.iter().chain(std::iter::once(&len)) {
        if b > start {
            out.push((start, b));
            start = b;
        }
    }
    out
}

/// Pick the checksum kind that validates the most whole segments
///
/// A kind qualifies when it validates at least two segments and at least
/// half of the segments long enough to hold its trailer. Ties go to the
/// kind listed first.
pub fn detect_checksum(kinds: &[ChecksumKind], data: &[u8], segments: &[(usize, usize)]) -> Option<ChecksumKind> {
    let mut best: Option<(ChecksumKind, usize)> = None;

    for &kind in kinds {
        let eligible = segments
            .iter()
            .filter(|(s, e)| e - s > kind.trailer_len())
            .count();
        let validated = segments
            .iter()
            .filter(|(s, e)| validate_window(kind, data, *s, *e).matched)
            .count();

        if validated < MIN_DETECTED_SEGMENTS || validated * 2 < eligible {
            continue;
        }
        if best.map_or(true, |(_, count)| validated > count) {
            best = Some((kind, validated));
        }
    }

    best.map(|(kind, _)| kind)
}

/// Scale down the confidence of packets whose length is an outlier
fn scale_outliers(packets: &mut [Packet]) {
    if packets.len() < 2 {
        return;
    }
    let count = packets.len() as f64;
    let mean = packets.iter().map(|p| p.len() as f64).sum::<f64>() / count;
    let variance = packets
        .iter()
        .map(|p| (p.len() as f64 - mean).powi(2))
        .sum::<f64>()
        / count;
    let limit = OUTLIER_SIGMA * variance.sqrt();
    if limit == 0.0 {
        return;
    }

    for packet in packets.iter_mut() {
        let deviation = (packet.len() as f64 - mean).abs();
        if deviation > limit {
            packet.confidence *= limit / deviation;
        }
    }
}

/// Infer packets with `params`
pub fn infer_packets(stream: &ByteStream, params: InferenceParams) -> Result<PacketSequence> {
    Ok(BoundaryInferencer::new(params)?.infer(stream)?.packets)
}
