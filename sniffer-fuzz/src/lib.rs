//! Fuzzing entry points for sniffer-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_infer

use sniffer_core::{ByteStream, CaptureFormat, LoadOptions};

pub fn fuzz_load_csv(data: &[u8]) {
    use sniffer_core::loader::load_bytes;

    // Malformed captures must fail with an error, never panic
    let _ = load_bytes(data, CaptureFormat::Csv, &LoadOptions::default());
}

pub fn fuzz_scan(data: &[u8]) {
    use sniffer_core::{ChecksumScanner, ScanConfig};

    if let Ok(scanner) = ChecksumScanner::new(ScanConfig::default().parallel(false)) {
        let _ = scanner.scan(data);
    }
}

/// Odd bytes are values, even bytes are the gap before them in 100µs units
pub fn fuzz_infer(data: &[u8]) {
    use sniffer_core::{
        analysis::{analyze_stream, AnalysisConfig},
        ChecksumKind, InferenceParams,
    };

    let mut t = 0u64;
    let samples = data.chunks_exact(2).map(|pair| {
        t += pair[0] as u64 * 100_000;
        (pair[1], t)
    });
    let Ok(stream) = ByteStream::from_samples(samples) else {
        return;
    };

    let _ = analyze_stream(&stream, &AnalysisConfig::default());

    let params = InferenceParams::default()
        .checksum(ChecksumKind::Xor)
        .sync_pattern(vec![0x7E]);
    let _ = analyze_stream(&stream, &AnalysisConfig::default().inference(params));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzz_load_empty() {
        fuzz_load_csv(&[]);
    }

    #[test]
    fn test_fuzz_load_random() {
        fuzz_load_csv(b"Timestamp,Direction\n\xff\xfe,RX,0x\n1e999,TX,0x1FF\n");
    }

    #[test]
    fn test_fuzz_scan_empty() {
        fuzz_scan(&[]);
    }

    #[test]
    fn test_fuzz_scan_uniform() {
        fuzz_scan(&[0xFF; 1024]);
    }

    #[test]
    fn test_fuzz_infer_short() {
        fuzz_infer(&[]);
        fuzz_infer(&[0x10, 0x7E]);
    }

    #[test]
    fn test_fuzz_infer_random() {
        let data: Vec<u8> = (0..2048u32).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect();
        fuzz_infer(&data);
    }
}
