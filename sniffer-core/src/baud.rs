//! Baud rate estimation
//!
//! Two sources are supported: the median inter-byte gap of a capture
//! (statistics) and raw signal edge timestamps from a logic probe. Both
//! produce a raw rate that is snapped to the nearest standard rate when
//! it is close enough.

use crate::constants::{
    BAUD_TOLERANCE, EDGE_MIN_CONSISTENT_PULSES, EDGE_MIN_SAMPLES, EDGE_NOISE_US, EDGE_PULSE_TOLERANCE,
    STANDARD_BAUD_RATES,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "logging")]
use tracing::debug;

/// Estimated line rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rate", rename_all = "snake_case")]
pub enum BaudEstimate {
    /// Not enough timing information
    #[default]
    Unknown,
    /// Within tolerance of a rate from the standard table
    Standard(u32),
    /// Computed rate, not close to any standard one
    NonStandard(u32),
}

impl BaudEstimate {
    /// Rate in bits per second, if known
    pub fn rate(&self) -> Option<u32> {
        match self {
            BaudEstimate::Unknown => None,
            BaudEstimate::Standard(r) | BaudEstimate::NonStandard(r) => Some(*r),
        }
    }

    /// Whether the rate matched the standard table
    pub fn is_standard(&self) -> bool {
        matches!(self, BaudEstimate::Standard(_))
    }
}

impl fmt::Display for BaudEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaudEstimate::Unknown => write!(f, "Unknown"),
            BaudEstimate::Standard(rate) => write!(f, "{}", rate),
            BaudEstimate::NonStandard(rate) => write!(f, "{} (non-standard)", rate),
        }
    }
}

/// Snap a raw rate to the closest standard rate within 5%
pub fn snap_to_standard(raw: f64) -> BaudEstimate {
    if !raw.is_finite() || raw <= 0.0 {
        return BaudEstimate::Unknown;
    }

    let closest = STANDARD_BAUD_RATES
        .iter()
        .copied()
        .min_by(|a, b| (raw - *a as f64).abs().total_cmp(&(raw - *b as f64).abs()));

    match closest {
        Some(rate) if (raw - rate as f64).abs() <= rate as f64 * BAUD_TOLERANCE => BaudEstimate::Standard(rate),
        _ => BaudEstimate::NonStandard(raw.round().min(u32::MAX as f64) as u32),
    }
}

/// Estimate from the median gap between consecutive bytes
///
/// `bits_per_byte` includes start and stop bits (10 for 8N1).
pub fn estimate_from_byte_gaps(median_gap_ns: f64, bits_per_byte: u32) -> BaudEstimate {
    if !median_gap_ns.is_finite() || median_gap_ns <= 0.0 || bits_per_byte == 0 {
        return BaudEstimate::Unknown;
    }
    snap_to_standard(bits_per_byte as f64 * 1e9 / median_gap_ns)
}

/// Estimate from signal edge timestamps in microseconds
///
/// The shortest pulse above the noise floor is taken as one bit period,
/// provided at least three pulses agree with it within 10%.
pub fn estimate_from_edges(edges_us: &[u64]) -> BaudEstimate {
    if edges_us.len() < EDGE_MIN_SAMPLES {
        #[cfg(feature = "logging")]
        debug!("Only {} edges, need {}", edges_us.len(), EDGE_MIN_SAMPLES);
        return BaudEstimate::Unknown;
    }

    let pulses: Vec<u64> = edges_us
        .windows(2)
        .map(|w| w[1].saturating_sub(w[0]))
        .filter(|&p| p > EDGE_NOISE_US)
        .collect();

    let Some(period) = pulses.iter().copied().min() else {
        return BaudEstimate::Unknown;
    };

    let tolerance = period as f64 * EDGE_PULSE_TOLERANCE;
    let consistent = pulses
        .iter()
        .filter(|&&p| (p as f64 - period as f64).abs() <= tolerance)
        .count();

    #[cfg(feature = "logging")]
    debug!("Bit period {}us, {} consistent pulses", period, consistent);

    if consistent < EDGE_MIN_CONSISTENT_PULSES {
        return BaudEstimate::Unknown;
    }
    snap_to_standard(1e6 / period as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pulses: &[u64]) -> Vec<u64> {
        let mut t = 1_000;
        let mut out = vec![t];
        for p in pulses {
            t += p;
            out.push(t);
        }
        out
    }

    #[test]
    fn test_snap() {
        assert_eq!(snap_to_standard(9615.0), BaudEstimate::Standard(9600));
        assert_eq!(snap_to_standard(117_000.0), BaudEstimate::Standard(115200));
        assert_eq!(snap_to_standard(12345.4), BaudEstimate::NonStandard(12345));
        assert_eq!(snap_to_standard(0.0), BaudEstimate::Unknown);
        assert_eq!(snap_to_standard(f64::NAN), BaudEstimate::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(BaudEstimate::Unknown.to_string(), "Unknown");
        assert_eq!(BaudEstimate::Standard(9600).to_string(), "9600");
        assert_eq!(BaudEstimate::NonStandard(12345).to_string(), "12345 (non-standard)");
    }

    #[test]
    fn test_from_byte_gaps() {
        // 8N1 at 9600 baud: one byte every 1.0417ms
        assert_eq!(estimate_from_byte_gaps(1_041_667.0, 10), BaudEstimate::Standard(9600));
        assert_eq!(estimate_from_byte_gaps(0.0, 10), BaudEstimate::Unknown);
    }

    #[test]
    fn test_edges_9600() {
        let e = edges(&[104, 208, 104, 312, 104, 104, 416, 208, 104, 520]);
        assert_eq!(estimate_from_edges(&e), BaudEstimate::Standard(9600));
    }

    #[test]
    fn test_edges_ignore_noise() {
        let e = edges(&[9, 3, 9, 18, 9, 27, 2, 9, 9, 18]);
        // 1e6 / 9 = 111111, within 5% of 115200
        assert_eq!(estimate_from_edges(&e), BaudEstimate::Standard(115200));
    }

    #[test]
    fn test_edges_non_standard() {
        let e = edges(&[81, 162, 81, 81, 243, 81, 162, 81, 324, 81]);
        assert_eq!(estimate_from_edges(&e), BaudEstimate::NonStandard(12346));
    }

    #[test]
    fn test_edges_insufficient() {
        assert_eq!(estimate_from_edges(&edges(&[104, 104, 104])), BaudEstimate::Unknown);
        // Shortest pulse seen only twice
        let e = edges(&[52, 208, 52, 312, 416, 208, 312, 416, 208, 520]);
        assert_eq!(estimate_from_edges(&e), BaudEstimate::Unknown);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&BaudEstimate::Standard(9600)).unwrap();
        assert_eq!(json, r#"{"kind":"standard","rate":9600}"#);
    }
}
