//! Default thresholds and lookup tables for capture analysis
//!
//! These are tunable starting points, not protocol requirements. Real
//! captures may need different values; every one of them can be overridden
//! through the parameter structs that consume it.

use crate::checksum::CrcParams;

/// Smallest checksum window (payload + trailer) considered by the scanner
pub const DEFAULT_MIN_WINDOW: usize = 2;

/// Largest checksum window considered by the scanner
pub const DEFAULT_MAX_WINDOW: usize = 64;

/// Absolute lower bound for `min_window`; a window needs at least one
/// payload byte and one trailer byte
pub const MIN_WINDOW_FLOOR: usize = 2;

/// Inter-byte gap multiple (of the median gap) treated as a packet boundary
pub const DEFAULT_GAP_MULTIPLIER: f64 = 3.0;

/// A packet length further than this many standard deviations from the mean
/// is an outlier and gets its confidence scaled down
pub const OUTLIER_SIGMA: f64 = 3.0;

/// Confidence of a packet validated by a checksum
pub const CHECKSUM_CONFIDENCE: f64 = 1.0;

/// Confidence of a packet delimited only by a timing gap or sync pattern
pub const TIMING_CONFIDENCE: f64 = 0.5;

/// Confidence of the fallback packet when no boundary signal exists at all
pub const UNDELIMITED_CONFIDENCE: f64 = 0.25;

/// Boundary disagreement (in bytes) resolved in favour of the checksum
pub const BOUNDARY_TOLERANCE: usize = 1;

/// Minimum number of whole timing segments a checksum kind must validate
/// before auto-detection adopts it
pub const MIN_DETECTED_SEGMENTS: usize = 2;

/// Fewest bytes the boundary inferencer can work with
pub const MIN_INFERENCE_BYTES: usize = 2;

/// Default bits on the wire per data byte (start + 8 data + stop)
pub const DEFAULT_BITS_PER_BYTE: u32 = 10;

/// Standard serial baud rates, ascending
pub const STANDARD_BAUD_RATES: [u32; 9] = [300, 1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];

/// Relative tolerance for snapping a computed baud rate to a standard one
pub const BAUD_TOLERANCE: f64 = 0.05;

/// Edge-timing detection: pulses at or below this width (µs) are noise
pub const EDGE_NOISE_US: u64 = 5;

/// Edge-timing detection: relative tolerance around the shortest pulse
pub const EDGE_PULSE_TOLERANCE: f64 = 0.10;

/// Edge-timing detection: pulses that must agree with the shortest one
pub const EDGE_MIN_CONSISTENT_PULSES: usize = 3;

/// Edge-timing detection: fewest edges worth analysing
pub const EDGE_MIN_SAMPLES: usize = 10;

/// Framing detection: longest shared packet prefix examined
pub const SYNC_MAX_LEN: usize = 4;

/// Framing detection: share of packets that must start with the prefix
pub const SYNC_MIN_COVERAGE: f64 = 0.8;

/// Framing detection: fewest packets worth examining
pub const SYNC_MIN_PACKETS: usize = 3;

/// CRC8 presets scanned when no polynomial is given
pub const CRC8_PRESETS: [CrcParams; 1] = [CrcParams::crc8(0x07, 0x00)];

/// CRC16 presets scanned when no polynomial is given
pub const CRC16_PRESETS: [CrcParams; 4] = [
    CrcParams::crc16(0x8005, 0x0000),
    CrcParams::crc16(0x8005, 0xFFFF).reflected(),
    CrcParams::crc16(0x1021, 0xFFFF),
    CrcParams::crc16(0x1021, 0x0000),
];
