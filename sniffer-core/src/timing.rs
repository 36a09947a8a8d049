//! Inter-byte timing: medians, gap thresholds and timing boundaries

/// Median of `values`, averaging the two middle elements for even counts
pub fn median(values: &[u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
    } else {
        Some(sorted[mid] as f64)
    }
}

/// Gap (ns) above which a boundary is declared: `multiplier × median gap`
///
/// Captures with coarse timestamps (e.g. whole milliseconds) often have a
/// median gap of zero; the median of the non-zero gaps is used instead.
pub fn gap_threshold_ns(gaps: &[u64], multiplier: f64) -> u64 {
    let base = match median(gaps) {
        Some(m) if m > 0.0 => m,
        Some(_) => {
            let nonzero: Vec<u64> = gaps.iter().copied().filter(|&g| g > 0).collect();
            median(&nonzero).unwrap_or(0.0)
        }
        None => 0.0,
    };
    (base * multiplier) as u64
}

/// Offsets where a new packet starts because the preceding gap exceeds
/// `threshold_ns`
///
/// `gaps[i]` is the gap between byte `i` and byte `i + 1`, so a boundary
/// caused by it sits at offset `i + 1`.
pub fn timing_boundaries(gaps: &[u64], threshold_ns: u64) -> Vec<usize> {
    gaps.iter()
        .enumerate()
        .filter(|(_, &g)| g > threshold_ns)
        .map(|(i, _)| i + 1)
        .collect()
}
