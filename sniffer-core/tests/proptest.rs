//! Property-based tests using proptest

use proptest::prelude::*;
use sniffer_core::{
    compute_statistics, infer_packets, loader, BoundaryInferencer, ByteStream, CaptureFormat, ChecksumKind,
    ChecksumScanner, InferenceParams, LoadOptions, ScanConfig, StatsConfig,
};

/// Bytes with gaps drawn from a few distinct scales
fn timed_stream() -> impl Strategy<Value = ByteStream> {
    prop::collection::vec((any::<u8>(), prop_oneof![Just(0u64), 1_000u64..2_000, 20_000u64..90_000]), 2..300)
        .prop_map(|samples| {
            let mut t = 0u64;
            let samples: Vec<(u8, u64)> = samples
                .into_iter()
                .map(|(b, gap)| {
                    t += gap;
                    (b, t)
                })
                .collect();
            ByteStream::from_samples(samples).unwrap()
        })
}

proptest! {
    #[test]
    fn prop_packets_ordered_and_disjoint(stream in timed_stream()) {
        let packets = infer_packets(&stream, InferenceParams::default()).unwrap();

        let mut previous_end = 0;
        for packet in &packets {
            prop_assert!(packet.start >= previous_end);
            prop_assert!(packet.end > packet.start);
            prop_assert!(packet.end <= stream.len());
            prop_assert!((0.0..=1.0).contains(&packet.confidence));
            previous_end = packet.end;
        }
    }

    #[test]
    fn prop_inference_deterministic(stream in timed_stream()) {
        let params = InferenceParams::default().checksum(ChecksumKind::Xor);
        let inferencer = BoundaryInferencer::new(params).unwrap();
        let first = inferencer.infer(&stream).unwrap();
        let second = inferencer.infer(&stream).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_total_bytes_matches_stream(stream in timed_stream()) {
        let packets = infer_packets(&stream, InferenceParams::default()).unwrap();
        let stats = compute_statistics(&packets, &stream, &StatsConfig::default());

        let covered: usize = packets.iter().map(|p| p.len()).sum();
        prop_assert_eq!(stats.total_bytes, stream.len());
        prop_assert_eq!(stats.total_bytes, covered + stats.gap_bytes);
    }

    #[test]
    fn prop_scan_matches_validate(data in prop::collection::vec(any::<u8>(), 0..80)) {
        let scanner = ChecksumScanner::new(ScanConfig::default().windows(2, 16)).unwrap();
        for candidate in &scanner.scan(&data) {
            prop_assert!(candidate.matched);
            prop_assert!(candidate.len() >= 2 && candidate.len() <= 16);
            let again = sniffer_core::checksum::validate_window(candidate.kind, &data, candidate.start, candidate.end);
            prop_assert!(again.matched);
        }
    }

    #[test]
    fn prop_short_stream_no_candidates(byte in any::<u8>()) {
        let scanner = ChecksumScanner::new(ScanConfig::default()).unwrap();
        prop_assert!(scanner.scan(&[byte]).is_empty());
    }

    #[test]
    fn prop_load_never_panics(data in prop::collection::vec(any::<u8>(), 0..2048)) {
        let _ = loader::load_bytes(&data, CaptureFormat::Csv, &LoadOptions::default());
    }
}
