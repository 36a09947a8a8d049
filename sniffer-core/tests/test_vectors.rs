//! Checksum test vectors
//!
//! Check values are the CRC catalogue results for the ASCII string
//! "123456789".

use sniffer_core::{
    checksum::validate_window, ByteStream, ChecksumAlgorithm, ChecksumKind, ChecksumScanner, CrcParams, ScanConfig,
};
use std::time::Duration;

const CHECK_INPUT: &[u8] = b"123456789";

fn crc16(poly: u16, init: u16) -> ChecksumKind {
    ChecksumKind::Crc16(CrcParams::crc16(poly, init))
}

#[test]
fn test_catalogue_vectors() {
    let vectors: &[(&str, ChecksumKind, u16)] = &[
        ("CRC-8", ChecksumKind::Crc8(CrcParams::crc8(0x07, 0x00)), 0xF4),
        ("CRC-16/UMTS", crc16(0x8005, 0x0000), 0xFEE8),
        ("CRC-16/ARC", ChecksumKind::Crc16(CrcParams::crc16(0x8005, 0x0000).reflected()), 0xBB3D),
        ("CRC-16/MODBUS", ChecksumKind::Crc16(CrcParams::crc16(0x8005, 0xFFFF).reflected()), 0x4B37),
        ("CRC-16/IBM-3740", crc16(0x1021, 0xFFFF), 0x29B1),
        ("CRC-16/XMODEM", crc16(0x1021, 0x0000), 0x31C3),
        ("XOR-8", ChecksumKind::Xor, 0x31),
        ("SUM-8", ChecksumKind::Sum, 0xDD),
    ];

    for (name, kind, expected) in vectors {
        assert_eq!(kind.compute(CHECK_INPUT), *expected, "{}", name);
    }
}

#[test]
fn test_trailer_byte_order() {
    let modbus = ChecksumKind::Crc16(CrcParams::crc16(0x8005, 0xFFFF).reflected());
    assert_eq!(modbus.encode_trailer(0x4B37), vec![0x37, 0x4B]);

    let xmodem = crc16(0x1021, 0x0000);
    assert_eq!(xmodem.encode_trailer(0x31C3), vec![0x31, 0xC3]);
}

#[test]
fn test_crc16_round_trip_and_corruption() {
    let kind = crc16(0x8005, 0x0000);
    let payload = b"\x02SENSOR:21.5C\x03";
    let frame = kind.frame(payload);
    let stream = ByteStream::from_bytes_with_interval(&frame, Duration::from_millis(1));

    let scanner = ChecksumScanner::new(ScanConfig::default().crc_params(CrcParams::crc16(0x8005, 0x0000))).unwrap();
    let candidates = scanner.scan(stream.data());

    let hits = candidates.at(0, frame.len());
    assert!(hits.iter().any(|c| c.kind == kind && c.matched));
    assert!(hits.iter().all(|c| c.confidence() == 1.0));

    // Corrupt one payload byte
    let mut corrupted = frame.clone();
    corrupted[4] ^= 0x01;
    let candidates = scanner.scan(&corrupted);
    assert!(candidates.at(0, corrupted.len()).iter().all(|c| c.kind != kind));
    assert!(!validate_window(kind, &corrupted, 0, corrupted.len()).matched);
}

#[test]
fn test_stream_shorter_than_window_is_empty() {
    let scanner = ChecksumScanner::new(ScanConfig::default()).unwrap();
    assert!(scanner.scan(&[0x42]).is_empty());
    assert!(scanner.scan(&[]).is_empty());
}

#[test]
fn test_algorithm_hint_restricts_kinds() {
    let scanner = ChecksumScanner::new(ScanConfig::default().algorithm(ChecksumAlgorithm::Crc16)).unwrap();
    assert_eq!(scanner.kinds().len(), 4);
    assert!(scanner
        .kinds()
        .iter()
        .all(|k| k.algorithm() == ChecksumAlgorithm::Crc16));
}

#[test]
fn test_zero_width_crc_rejected() {
    let params = CrcParams {
        width: 0,
        poly: 0x07,
        init: 0,
        reflect: false,
    };
    let err = ChecksumScanner::new(ScanConfig::default().crc_params(params)).unwrap_err();
    assert!(err.to_string().contains("width"));
}
