//! Capture statistics

use crate::baud::{estimate_from_byte_gaps, BaudEstimate};
use crate::constants::DEFAULT_BITS_PER_BYTE;
use crate::timing::median;
use crate::types::{ByteStream, PacketSequence};
use serde::Serialize;
use std::time::Duration;

/// Statistics settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsConfig {
    /// Line bits per data byte, start and stop bits included
    pub bits_per_byte: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            bits_per_byte: DEFAULT_BITS_PER_BYTE,
        }
    }
}

impl StatsConfig {
    /// Set bits per byte
    pub fn bits_per_byte(mut self, bits: u32) -> Self {
        self.bits_per_byte = bits;
        self
    }
}

/// Aggregate figures for one analysed capture
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CaptureStatistics {
    /// Bytes in the stream
    pub total_bytes: usize,
    /// Inferred packets
    pub total_packets: usize,
    /// Packets confirmed by a checksum
    pub confirmed_packets: usize,
    /// Bytes outside every packet
    pub gap_bytes: usize,
    /// Shortest packet
    pub min_packet_len: usize,
    /// Longest packet
    pub max_packet_len: usize,
    /// Average packet length
    pub mean_packet_len: f64,
    /// Average packet confidence
    pub mean_confidence: f64,
    /// Estimated line rate
    pub baud_rate: BaudEstimate,
    /// Last minus first byte timestamp, in nanoseconds
    pub duration_ns: u64,
}

impl CaptureStatistics {
    /// Capture duration
    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.duration_ns)
    }

    /// Duration formatted for display
    pub fn duration_display(&self) -> String {
        format_duration(self.duration())
    }
}

/// `0s` for zero, otherwise seconds with three decimals
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        "0s".to_string()
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

/// Summarise `packets` inferred from `stream`
///
/// An empty packet sequence gives all-zero statistics.
pub fn compute_statistics(packets: &PacketSequence, stream: &ByteStream, config: &StatsConfig) -> CaptureStatistics {
    if packets.is_empty() {
        return CaptureStatistics::default();
    }

    let lengths: Vec<usize> = packets.iter().map(|p| p.len()).collect();
    let covered: usize = lengths.iter().sum();
    let count = packets.len();

    // Only gaps between bytes of the same packet reflect the line rate
    let gaps = stream.gaps();
    let intra: Vec<u64> = packets
        .iter()
        .flat_map(|p| p.start..p.end.saturating_sub(1))
        .filter_map(|i| gaps.get(i).copied())
        .collect();
    let baud_rate = median(&intra)
        .map(|m| estimate_from_byte_gaps(m, config.bits_per_byte))
        .unwrap_or_default();

    CaptureStatistics {
        total_bytes: stream.len(),
        total_packets: count,
        confirmed_packets: packets.iter().filter(|p| p.is_confirmed()).count(),
        gap_bytes: stream.len().saturating_sub(covered),
        min_packet_len: lengths.iter().copied().min().unwrap_or_default(),
        max_packet_len: lengths.iter().copied().max().unwrap_or_default(),
        mean_packet_len: covered as f64 / count as f64,
        mean_confidence: packets.iter().map(|p| p.confidence).sum::<f64>() / count as f64,
        baud_rate,
        duration_ns: stream.duration().as_nanos() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Packet, PacketSignal};

    fn packet(start: usize, end: usize, confidence: f64) -> Packet {
        Packet {
            start,
            end,
            checksum: None,
            confidence,
            signal: PacketSignal::Timing,
        }
    }

    #[test]
    fn test_empty_packets_all_zero() {
        let stats = compute_statistics(&PacketSequence::empty(), &ByteStream::default(), &StatsConfig::default());
        assert_eq!(stats.total_bytes, 0);
        assert_eq!(stats.total_packets, 0);
        assert_eq!(stats.baud_rate.to_string(), "Unknown");
        assert_eq!(stats.duration_display(), "0s");
    }

    #[test]
    fn test_statistics_9600() {
        // 1.0417ms per byte, 20ms idle between packets
        let mut samples = Vec::new();
        let mut t = 0u64;
        for i in 0..12u8 {
            if i == 6 {
                t += 20_000_000;
            }
            samples.push((i, t));
            t += 1_041_667;
        }
        let stream = ByteStream::from_samples(samples).unwrap();
        let packets = PacketSequence::new(vec![packet(0, 5, 0.5), packet(6, 12, 1.0)]).unwrap();

        let stats = compute_statistics(&packets, &stream, &StatsConfig::default());
        assert_eq!(stats.total_bytes, 12);
        assert_eq!(stats.total_packets, 2);
        assert_eq!(stats.gap_bytes, 1);
        assert_eq!(stats.min_packet_len, 5);
        assert_eq!(stats.max_packet_len, 6);
        assert_eq!(stats.mean_packet_len, 5.5);
        assert_eq!(stats.mean_confidence, 0.75);
        assert_eq!(stats.baud_rate, BaudEstimate::Standard(9600));
        assert_eq!(stats.duration_ns, 31_458_337);
        assert_eq!(stats.duration_display(), "0.031s");
    }

    #[test]
    fn test_bits_per_byte() {
        let stream = ByteStream::from_bytes_with_interval(&[0; 8], Duration::from_nanos(1_041_667));
        let packets = PacketSequence::new(vec![packet(0, 8, 0.5)]).unwrap();
        let stats = compute_statistics(&packets, &stream, &StatsConfig::default().bits_per_byte(11));
        assert_eq!(stats.baud_rate, BaudEstimate::NonStandard(10560));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1.500s");
    }
}
