//! Framing pattern detection
//!
//! Many serial protocols open every message with one or more fixed sync
//! bytes (`0xAA 0x55`, `STX`, ...). Once packets have been inferred, a
//! prefix shared by most of them is a strong hint of such a pattern.

use crate::constants::{SYNC_MAX_LEN, SYNC_MIN_COVERAGE, SYNC_MIN_PACKETS};
use crate::types::PacketSequence;
use memchr::memmem;
use serde::Serialize;
use std::collections::BTreeMap;

#[cfg(feature = "logging")]
use tracing::debug;

/// A packet prefix shared by most packets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncPattern {
    /// Pattern bytes
    #[serde(serialize_with = "as_hex")]
    pub bytes: Vec<u8>,

    /// Fraction of packets starting with the pattern
    pub coverage: f64,

    /// Non-overlapping occurrences in the whole stream
    pub occurrences: usize,
}

fn as_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> core::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

impl SyncPattern {
    /// Pattern as lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// Find the longest prefix (up to four bytes) that at least 80% of
/// `packets` start with
///
/// Returns `None` with fewer than three packets. Among prefixes of the same
/// length the most common wins, then the lexicographically smallest.
pub fn detect_sync_pattern(data: &[u8], packets: &PacketSequence) -> Option<SyncPattern> {
    if packets.len() < SYNC_MIN_PACKETS {
        return None;
    }
    let total = packets.len() as f64;

    for len in (1..=SYNC_MAX_LEN).rev() {
        let mut counts: BTreeMap<&[u8], usize> = BTreeMap::new();
        for packet in packets {
            if packet.len() >= len && packet.end <= data.len() {
                *counts.entry(&data[packet.start..packet.start + len]).or_default() += 1;
            }
        }

        // max_by_key keeps the last maximum, so walk keys descending
        let best = counts
            .into_iter()
            .rev()
            .max_by_key(|&(_, count)| count);

        if let Some((prefix, count)) = best {
            let coverage = count as f64 / total;
            if coverage >= SYNC_MIN_COVERAGE {
                let occurrences = memmem::find_iter(data, prefix).count();

                #[cfg(feature = "logging")]
                debug!(
                    "Sync pattern {} covers {:.0}% of packets ({} occurrences)",
                    hex::encode(prefix),
                    coverage * 100.0,
                    occurrences
                );

                return Some(SyncPattern {
                    bytes: prefix.to_vec(),
                    coverage,
                    occurrences,
                });
            }
        }
    }

    None
}

/// Measure a known `pattern` against `packets` and the whole stream
///
/// Unlike [`detect_sync_pattern`] this always returns a value, with the
/// coverage that was actually observed.
pub fn measure_sync_pattern(data: &[u8], packets: &PacketSequence, pattern: &[u8]) -> SyncPattern {
    let starting = packets
        .iter()
        .filter(|p| p.end <= data.len() && data[p.start..p.end].starts_with(pattern))
        .count();
    let coverage = if packets.is_empty() {
        0.0
    } else {
        starting as f64 / packets.len() as f64
    };
    let occurrences = if pattern.is_empty() {
        0
    } else {
        memmem::find_iter(data, pattern).count()
    };

    SyncPattern {
        bytes: pattern.to_vec(),
        coverage,
        occurrences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Packet, PacketSignal};

    fn sequence(bounds: &[(usize, usize)]) -> PacketSequence {
        PacketSequence::new(
            bounds
                .iter()
                .map(|&(start, end)| Packet {
                    start,
                    end,
                    checksum: None,
                    confidence: 0.5,
                    signal: PacketSignal::Timing,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_detects_two_byte_header() {
        let data = [0xAA, 0x55, 1, 2, 0xAA, 0x55, 3, 0xAA, 0x55, 4, 5, 6];
        let packets = sequence(&[(0, 4), (4, 7), (7, 12)]);

        let pattern = detect_sync_pattern(&data, &packets).unwrap();
        assert_eq!(pattern.bytes, vec![0xAA, 0x55]);
        assert_eq!(pattern.coverage, 1.0);
        assert_eq!(pattern.occurrences, 3);
        assert_eq!(pattern.to_hex(), "aa55");
    }

    #[test]
    fn test_coverage_threshold() {
        // Only 3 of 5 packets share a first byte
        let data = [7, 0, 7, 1, 7, 2, 8, 3, 9, 4];
        let packets = sequence(&[(0, 2), (2, 4), (4, 6), (6, 8), (8, 10)]);
        assert_eq!(detect_sync_pattern(&data, &packets), None);
    }

    #[test]
    fn test_too_few_packets() {
        let data = [0xAA, 1, 0xAA, 2];
        let packets = sequence(&[(0, 2), (2, 4)]);
        assert_eq!(detect_sync_pattern(&data, &packets), None);
    }

    #[test]
    fn test_measure_known_pattern() {
        let data = [1, 0xAA, 2, 0xAA, 3, 4];
        let packets = sequence(&[(0, 1), (1, 3), (3, 6)]);

        let pattern = measure_sync_pattern(&data, &packets, &[0xAA]);
        assert_eq!(pattern.bytes, vec![0xAA]);
        assert_eq!(pattern.occurrences, 2);
        assert!((pattern.coverage - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(measure_sync_pattern(&data, &PacketSequence::empty(), &[0xAA]).coverage, 0.0);
    }

    #[test]
    fn test_serializes_as_hex() {
        let pattern = SyncPattern {
            bytes: vec![0x02, 0xFF],
            coverage: 1.0,
            occurrences: 2,
        };
        let json = serde_json::to_value(&pattern).unwrap();
        assert_eq!(json["bytes"], "02ff");
    }
}
