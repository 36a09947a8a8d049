//! Checksum computation and sliding-window checksum scanning
//!
//! A window `[start, end)` is read as a payload followed by a trailer of
//! [`ChecksumKind::trailer_len`] bytes. The window matches when the checksum
//! of the payload equals the trailer. Scanning every window of every length
//! between `min_window` and `max_window` reveals which algorithm, and which
//! frame lengths, a device most likely uses.

use crate::constants::{
    CHECKSUM_CONFIDENCE, CRC16_PRESETS, CRC8_PRESETS, DEFAULT_MAX_WINDOW, DEFAULT_MIN_WINDOW,
    MIN_WINDOW_FLOOR,
};
use crate::error::AnalysisError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::thread;

#[cfg(feature = "logging")]
use tracing::debug;

/// Checksum algorithm family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumAlgorithm {
    /// 8-bit cyclic redundancy check
    Crc8,
    /// 16-bit cyclic redundancy check
    Crc16,
    /// XOR of all payload bytes
    Xor,
    /// Sum of all payload bytes modulo 256
    Sum,
}

impl ChecksumAlgorithm {
    /// Every supported algorithm, in scan order
    pub const ALL: [ChecksumAlgorithm; 4] = [
        ChecksumAlgorithm::Crc8,
        ChecksumAlgorithm::Crc16,
        ChecksumAlgorithm::Xor,
        ChecksumAlgorithm::Sum,
    ];
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChecksumAlgorithm::Crc8 => "crc8",
            ChecksumAlgorithm::Crc16 => "crc16",
            ChecksumAlgorithm::Xor => "xor",
            ChecksumAlgorithm::Sum => "sum",
        };
        f.pad(s)
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "crc8" => Ok(ChecksumAlgorithm::Crc8),
            "crc16" => Ok(ChecksumAlgorithm::Crc16),
            "xor" => Ok(ChecksumAlgorithm::Xor),
            "sum" => Ok(ChecksumAlgorithm::Sum),
            other => Err(AnalysisError::invalid_parameter(
                "algorithm",
                format!("unknown checksum algorithm '{}'", other),
            )),
        }
    }
}

/// CRC parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrcParams {
    /// Register width in bits (8 or 16)
    pub width: u8,

    /// Generator polynomial, normal (MSB-first) notation, implicit top bit
    pub poly: u16,

    /// Initial register value
    pub init: u16,

    /// Process bits LSB-first; reflected 16-bit trailers are little-endian
    pub reflect: bool,
}

impl CrcParams {
    /// 8-bit CRC, MSB-first
    pub const fn crc8(poly: u16, init: u16) -> Self {
        Self {
            width: 8,
            poly,
            init,
            reflect: false,
        }
    }

    /// 16-bit CRC, MSB-first
    pub const fn crc16(poly: u16, init: u16) -> Self {
        Self {
            width: 16,
            poly,
            init,
            reflect: false,
        }
    }

    /// Same parameters, LSB-first
    pub const fn reflected(mut self) -> Self {
        self.reflect = true;
        self
    }

    /// Register mask for this width
    pub fn mask(&self) -> u16 {
        u16::MAX
            .checked_shr(16u32.saturating_sub(self.width as u32))
            .unwrap_or(0)
    }

    /// Reject structurally invalid parameter sets
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(AnalysisError::invalid_parameter("width", "zero-width CRC"));
        }
        if self.width != 8 && self.width != 16 {
            return Err(AnalysisError::invalid_parameter(
                "width",
                format!("unsupported CRC width {} (expected 8 or 16)", self.width),
            ));
        }
        if self.poly == 0 {
            return Err(AnalysisError::invalid_parameter("poly", "polynomial must be non-zero"));
        }
        if self.poly & !self.mask() != 0 {
            return Err(AnalysisError::invalid_parameter(
                "poly",
                format!("0x{:X} does not fit in {} bits", self.poly, self.width),
            ));
        }
        if self.init & !self.mask() != 0 {
            return Err(AnalysisError::invalid_parameter(
                "init",
                format!("0x{:X} does not fit in {} bits", self.init, self.width),
            ));
        }
        Ok(())
    }
}

fn reflect_bits(value: u16, width: u32) -> u16 {
    let mut out = 0u16;
    for i in 0..width {
        if value & (1 << i) != 0 {
            out |= 1 << (width - 1 - i);
        }
    }
    out
}

/// A fully parameterised checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum ChecksumKind {
    /// 8-bit CRC
    Crc8(CrcParams),
    /// 16-bit CRC
    Crc16(CrcParams),
    /// XOR of payload bytes
    Xor,
    /// Additive sum of payload bytes, modulo 256
    Sum,
}

impl ChecksumKind {
    /// Algorithm family tag
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        match self {
            ChecksumKind::Crc8(_) => ChecksumAlgorithm::Crc8,
            ChecksumKind::Crc16(_) => ChecksumAlgorithm::Crc16,
            ChecksumKind::Xor => ChecksumAlgorithm::Xor,
            ChecksumKind::Sum => ChecksumAlgorithm::Sum,
        }
    }

    /// CRC parameters, if this is a CRC
    pub fn crc_params(&self) -> Option<&CrcParams> {
        match self {
            ChecksumKind::Crc8(p) | ChecksumKind::Crc16(p) => Some(p),
            _ => None,
        }
    }

    /// Number of trailer bytes carrying the checksum
    pub fn trailer_len(&self) -> usize {
        match self {
            ChecksumKind::Crc16(_) => 2,
            _ => 1,
        }
    }

    /// Check that the parameters fit the algorithm
    pub fn validate(&self) -> Result<()> {
        match self {
            ChecksumKind::Crc8(p) => {
                p.validate()?;
                if p.width != 8 {
                    return Err(AnalysisError::invalid_parameter(
                        "width",
                        format!("CRC8 requires width 8, got {}", p.width),
                    ));
                }
                Ok(())
            }
            ChecksumKind::Crc16(p) => {
                p.validate()?;
                if p.width != 16 {
                    return Err(AnalysisError::invalid_parameter(
                        "width",
                        format!("CRC16 requires width 16, got {}", p.width),
                    ));
                }
                Ok(())
            }
            ChecksumKind::Xor | ChecksumKind::Sum => Ok(()),
        }
    }

    /// Checksum of `payload`
    pub fn compute(&self, payload: &[u8]) -> u16 {
        let mut state = Checksummer::new(*self);
        for &b in payload {
            state.update(b);
        }
        state.value()
    }

    /// Decode a trailer as it appears on the wire
    pub fn read_trailer(&self, trailer: &[u8]) -> u16 {
        match (self, trailer) {
            (ChecksumKind::Crc16(p), [a, b]) if p.reflect => u16::from_le_bytes([*a, *b]),
            (ChecksumKind::Crc16(_), [a, b]) => u16::from_be_bytes([*a, *b]),
            (_, [a]) => *a as u16,
            _ => 0,
        }
    }

    /// Encode a checksum value as it would appear on the wire
    pub fn encode_trailer(&self, value: u16) -> Vec<u8> {
        match self {
            ChecksumKind::Crc16(p) if p.reflect => value.to_le_bytes().to_vec(),
            ChecksumKind::Crc16(_) => value.to_be_bytes().to_vec(),
            _ => vec![value as u8],
        }
    }

    /// `payload` followed by its checksum trailer
    pub fn frame(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = payload.to_vec();
        out.extend(self.encode_trailer(self.compute(payload)));
        out
    }
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumKind::Crc8(p) | ChecksumKind::Crc16(p) => {
                write!(
                    f,
                    "{}(poly=0x{:0w$X},init=0x{:0w$X}{})",
                    self.algorithm(),
                    p.poly,
                    p.init,
                    if p.reflect { ",reflected" } else { "" },
                    w = (p.width as usize / 4).max(2)
                )
            }
            other => write!(f, "{}", other.algorithm()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Engine {
    Xor,
    Sum,
    Crc {
        reflect: bool,
        poly: u16,
        mask: u16,
        top: u16,
        shift: u32,
    },
}

/// Incremental checksum state
#[derive(Debug, Clone)]
pub struct Checksummer {
    engine: Engine,
    reg: u16,
}

impl Checksummer {
    /// Fresh state for `kind`
    pub fn new(kind: ChecksumKind) -> Self {
        match kind {
            ChecksumKind::Xor => Self {
                engine: Engine::Xor,
                reg: 0,
            },
            ChecksumKind::Sum => Self {
                engine: Engine::Sum,
                reg: 0,
            },
            ChecksumKind::Crc8(p) | ChecksumKind::Crc16(p) => {
                let width = (p.width as u32).min(16);
                let mask = p.mask();
                let (poly, reg) = if p.reflect {
                    (reflect_bits(p.poly, width), reflect_bits(p.init, width))
                } else {
                    (p.poly, p.init)
                };
                Self {
                    engine: Engine::Crc {
                        reflect: p.reflect,
                        poly: poly & mask,
                        mask,
                        top: if width == 0 { 0 } else { 1 << (width - 1) },
                        shift: width.saturating_sub(8),
                    },
                    reg: reg & mask,
                }
            }
        }
    }

    /// Feed one payload byte
    pub fn update(&mut self, byte: u8) {
        match self.engine {
            Engine::Xor => self.reg ^= byte as u16,
            Engine::Sum => self.reg = (self.reg + byte as u16) & 0xFF,
            Engine::Crc {
                reflect: true,
                poly,
                mask,
                ..
            } => {
                let mut crc = self.reg ^ byte as u16;
                for _ in 0..8 {
                    crc = if crc & 1 != 0 { (crc >> 1) ^ poly } else { crc >> 1 };
                }
                self.reg = crc & mask;
            }
            Engine::Crc {
                reflect: false,
                poly,
                mask,
                top,
                shift,
            } => {
                let mut crc = (self.reg ^ ((byte as u16) << shift)) & mask;
                for _ in 0..8 {
                    let shifted = if crc & top != 0 { (crc << 1) ^ poly } else { crc << 1 };
                    crc = shifted & mask;
                }
                self.reg = crc;
            }
        }
    }

    /// Checksum of everything fed so far
    pub fn value(&self) -> u16 {
        self.reg
    }
}

/// One checksum test over a window of the stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChecksumCandidate {
    /// Checksum tested
    pub kind: ChecksumKind,

    /// Window start (inclusive)
    pub start: usize,

    /// Window end (exclusive); the trailer is the last bytes of the window
    pub end: usize,

    /// Whether the trailer equals the computed checksum
    pub matched: bool,

    /// Whether another checksum kind also matched this exact window
    pub ambiguous: bool,
}

impl ChecksumCandidate {
    /// Window length including trailer
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Payload portion of the window
    pub fn payload_range(&self) -> std::ops::Range<usize> {
        self.start..self.end.saturating_sub(self.kind.trailer_len())
    }

    /// Confidence that the window is a genuine checksummed frame
    pub fn confidence(&self) -> f64 {
        if self.matched {
            CHECKSUM_CONFIDENCE
        } else {
            0.0
        }
    }
}

/// Test a single window
///
/// Windows that fall outside `data` or leave no payload byte never match.
pub fn validate_window(kind: ChecksumKind, data: &[u8], start: usize, end: usize) -> ChecksumCandidate {
    let trailer = kind.trailer_len();
    let matched = end <= data.len()
        && start < end
        && end - start > trailer
        && kind.compute(&data[start..end - trailer]) == kind.read_trailer(&data[end - trailer..end]);

    ChecksumCandidate {
        kind,
        start,
        end,
        matched,
        ambiguous: false,
    }
}

/// Lazy iterator over the ends of matching windows that begin at one offset
///
/// Window lengths grow by one byte per step, so the payload checksum is
/// updated incrementally instead of recomputed.
#[derive(Debug, Clone)]
pub struct MatchingEnds<'a> {
    data: &'a [u8],
    kind: ChecksumKind,
    state: Checksummer,
    start: usize,
    payload_end: usize,
    min_window: usize,
    max_window: usize,
}

impl<'a> MatchingEnds<'a> {
    /// Windows starting at `start` with length in `[min_window, max_window]`
    pub fn new(kind: ChecksumKind, data: &'a [u8], start: usize, min_window: usize, max_window: usize) -> Self {
        Self {
            data,
            kind,
            state: Checksummer::new(kind),
            start,
            payload_end: start,
            min_window,
            max_window,
        }
    }
}

impl Iterator for MatchingEnds<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let trailer = self.kind.trailer_len();
        while self.payload_end < self.data.len() {
            self.state.update(self.data[self.payload_end]);
            self.payload_end += 1;

            let end = self.payload_end + trailer;
            if end > self.data.len() || end - self.start > self.max_window {
                self.payload_end = self.data.len();
                return None;
            }
            if end - self.start < self.min_window {
                continue;
            }
            if self.state.value() == self.kind.read_trailer(&self.data[self.payload_end..end]) {
                return Some(end);
            }
        }
        None
    }
}

/// Scanner configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Restrict the scan to one algorithm; `None` scans all four
    pub algorithm: Option<ChecksumAlgorithm>,

    /// CRC8 parameters; `None` scans the CRC8 presets
    pub crc8: Option<CrcParams>,

    /// CRC16 parameters; `None` scans the CRC16 presets
    pub crc16: Option<CrcParams>,

    /// Shortest window (payload + trailer)
    pub min_window: usize,

    /// Longest window (payload + trailer)
    pub max_window: usize,

    /// Scan algorithms on separate worker threads
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            algorithm: None,
            crc8: None,
            crc16: None,
            min_window: DEFAULT_MIN_WINDOW,
            max_window: DEFAULT_MAX_WINDOW,
            parallel: true,
        }
    }
}

impl ScanConfig {
    /// Only scan `algorithm`
    pub fn algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Use explicit CRC parameters for the matching width
    pub fn crc_params(mut self, params: CrcParams) -> Self {
        if params.width == 16 {
            self.crc16 = Some(params);
        } else {
            self.crc8 = Some(params);
        }
        self
    }

    /// Window length bounds
    pub fn windows(mut self, min_window: usize, max_window: usize) -> Self {
        self.min_window = min_window;
        self.max_window = max_window;
        self
    }

    /// Toggle per-algorithm worker threads
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validate and expand into the list of checksum kinds to test
    pub fn kinds(&self) -> Result<Vec<ChecksumKind>> {
        if self.min_window < MIN_WINDOW_FLOOR {
            return Err(AnalysisError::invalid_parameter(
                "min_window",
                format!("must be at least {}", MIN_WINDOW_FLOOR),
            ));
        }
        if self.max_window < self.min_window {
            return Err(AnalysisError::invalid_parameter(
                "max_window",
                format!("{} is smaller than min_window {}", self.max_window, self.min_window),
            ));
        }

        let algorithms = match self.algorithm {
            Some(a) => vec![a],
            None => ChecksumAlgorithm::ALL.to_vec(),
        };

        let mut kinds = Vec::new();
        for algorithm in algorithms {
            match algorithm {
                ChecksumAlgorithm::Crc8 => match self.crc8 {
                    Some(p) => kinds.push(ChecksumKind::Crc8(p)),
                    None => kinds.extend(CRC8_PRESETS.iter().copied().map(ChecksumKind::Crc8)),
                },
                ChecksumAlgorithm::Crc16 => match self.crc16 {
                    Some(p) => kinds.push(ChecksumKind::Crc16(p)),
                    None => kinds.extend(CRC16_PRESETS.iter().copied().map(ChecksumKind::Crc16)),
                },
                ChecksumAlgorithm::Xor => kinds.push(ChecksumKind::Xor),
                ChecksumAlgorithm::Sum => kinds.push(ChecksumKind::Sum),
            }
        }

        for kind in &kinds {
            kind.validate()?;
        }
        Ok(kinds)
    }
}

/// Per-kind match counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindSummary {
    /// Checksum kind
    pub kind: ChecksumKind,
    /// Matching windows
    pub matches: usize,
    /// Matching windows shared with another kind
    pub ambiguous: usize,
}

/// Ranked checksum matches from one scan
///
/// Ordered by window length descending, then start ascending, then scan
/// order of the kind. Iterating is restartable.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CandidateSet {
    kinds: Vec<ChecksumKind>,
    candidates: Vec<ChecksumCandidate>,
}

impl CandidateSet {
    /// Number of matches
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether no window matched
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Iterate matches in rank order
    pub fn iter(&self) -> std::slice::Iter<'_, ChecksumCandidate> {
        self.candidates.iter()
    }

    /// Matches covering exactly `[start, end)`
    pub fn at(&self, start: usize, end: usize) -> Vec<&ChecksumCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.start == start && c.end == end)
            .collect()
    }

    /// Match counts for every scanned kind, in scan order
    pub fn summary(&self) -> Vec<KindSummary> {
        self.kinds
            .iter()
            .map(|kind| {
                let of_kind = self.candidates.iter().filter(|c| c.kind == *kind);
                let (matches, ambiguous) =
                    of_kind.fold((0, 0), |(m, a), c| (m + 1, a + c.ambiguous as usize));
                KindSummary {
                    kind: *kind,
                    matches,
                    ambiguous,
                }
            })
            .collect()
    }

    /// Consume into ranked matches
    pub fn into_vec(self) -> Vec<ChecksumCandidate> {
        self.candidates
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a ChecksumCandidate;
    type IntoIter = std::slice::Iter<'a, ChecksumCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// Sliding-window checksum scanner
///
/// Stateless between scans: the same scanner can be applied to any number
/// of streams and always yields the same result for the same input.
#[derive(Debug, Clone)]
pub struct ChecksumScanner {
    config: ScanConfig,
    kinds: Vec<ChecksumKind>,
}

impl ChecksumScanner {
    /// Validate `config` and build a scanner
    pub fn new(config: ScanConfig) -> Result<Self> {
        let kinds = config.kinds()?;
        Ok(Self { config, kinds })
    }

    /// Kinds tested, in scan order
    pub fn kinds(&self) -> &[ChecksumKind] {
        &self.kinds
    }

    /// Configuration in use
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Lazy matches for one kind starting at one offset
    pub fn matching_ends<'a>(&self, kind: ChecksumKind, data: &'a [u8], start: usize) -> MatchingEnds<'a> {
        MatchingEnds::new(kind, data, start, self.config.min_window, self.config.max_window)
    }

    /// Scan every window of `data` with every configured kind
    pub fn scan(&self, data: &[u8]) -> CandidateSet {
        #[cfg(feature = "logging")]
        debug!(
            "Scanning {} bytes with {} checksum kinds, windows {}..={}",
            data.len(),
            self.kinds.len(),
            self.config.min_window,
            self.config.max_window
        );

        let mut groups: Vec<Vec<ChecksumKind>> = Vec::new();
        for algorithm in ChecksumAlgorithm::ALL {
            let group: Vec<_> = self
                .kinds
                .iter()
                .copied()
                .filter(|k| k.algorithm() == algorithm)
                .collect();
            if !group.is_empty() {
                groups.push(group);
            }
        }

        let mut candidates: Vec<ChecksumCandidate> = if self.config.parallel && groups.len() > 1 {
            thread::scope(|s| {
                let handles: Vec<_> = groups
                    .iter()
                    .map(|group| s.spawn(move || self.scan_kinds(group, data)))
                    .collect();
                handles
                    .into_iter()
                    .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                    .collect()
            })
        } else {
            groups.iter().flat_map(|g| self.scan_kinds(g, data)).collect()
        };

        mark_ambiguous(&mut candidates);

        let order = |kind: &ChecksumKind| self.kinds.iter().position(|k| k == kind).unwrap_or(usize::MAX);
        candidates.sort_by_key(|c| (Reverse(c.len()), c.start, order(&c.kind)));

        #[cfg(feature = "logging")]
        debug!("Checksum scan complete: {} matching windows", candidates.len());

        CandidateSet {
            kinds: self.kinds.clone(),
            candidates,
        }
    }

    fn scan_kinds(&self, kinds: &[ChecksumKind], data: &[u8]) -> Vec<ChecksumCandidate> {
        let mut out = Vec::new();
        for &kind in kinds {
            for start in 0..data.len() {
                for end in self.matching_ends(kind, data, start) {
                    out.push(ChecksumCandidate {
                        kind,
                        start,
                        end,
                        matched: true,
                        ambiguous: false,
                    });
                }
            }
        }
        out
    }
}

fn mark_ambiguous(candidates: &mut [ChecksumCandidate]) {
    candidates.sort_by_key(|c| (c.start, c.end));
    let mut i = 0;
    while i < candidates.len() {
        let mut j = i + 1;
        while j < candidates.len()
            && candidates[j].start == candidates[i].start
            && candidates[j].end == candidates[i].end
        {
            j += 1;
        }
        if j - i > 1 {
            for c in &mut candidates[i..j] {
                c.ambiguous = true;
            }
        }
        i = j;
    }
}
