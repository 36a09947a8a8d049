use sniffer_cli::commands::checksum::{self, ChecksumArgs};
use sniffer_cli::{AlgorithmArg, InputOptions};
use sniffer_core::{ChecksumKind, CrcParams};
use std::fs;
use tempfile::tempdir;

/// Helper: write frames as a recorder CSV with idle time between frames
fn write_capture(path: &std::path::Path, frames: &[Vec<u8>]) {
    let mut csv = String::from("Timestamp,Direction,Value_Hex,Value_ASCII,Status\n");
    let mut t = 0u32;
    for frame in frames {
        for b in frame {
            csv.push_str(&format!("{},RX,0x{:02X},.,OK\n", t, b));
            t += 1;
        }
        t += 20;
    }
    fs::write(path, csv).unwrap();
}

fn run(args: &ChecksumArgs) -> String {
    colored::control::set_override(false);
    let mut out = Vec::new();
    checksum::execute(args, &InputOptions::default(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_checksum_finds_crc16_frame() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("capture.csv");
    let kind = ChecksumKind::Crc16(CrcParams::crc16(0x8005, 0));
    let frame = kind.frame(b"\x10\x20\x30\x40\x50");
    write_capture(&input, &[frame.clone()]);

    let mut args = ChecksumArgs::new(input.to_str().unwrap());
    args.algorithm = Some(AlgorithmArg::Crc16);
    args.poly = Some(0x8005);
    let output = run(&args);

    assert!(output.contains("Bytes scanned:     7"));
    assert!(output.contains(&format!("[     0,      {})", frame.len())));
    assert!(output.contains("crc16(poly=0x8005,init=0x0000)"));
}

#[test]
fn test_checksum_writes_json() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("capture.csv");
    let output = dir.path().join("matches.json");
    let frames = vec![ChecksumKind::Xor.frame(&[1, 2, 4]), ChecksumKind::Xor.frame(&[8, 16])];
    write_capture(&input, &frames);

    let mut args = ChecksumArgs::new(input.to_str().unwrap());
    args.algorithm = Some(AlgorithmArg::Xor);
    args.output = Some(output.to_str().unwrap().to_string());
    run(&args);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["bytes_scanned"], 7);
    let matches = json["matches"].as_array().unwrap();
    assert!(matches.iter().any(|m| m["start"] == 0 && m["end"] == 4 && m["confidence"] == 1.0));
    assert!(matches.iter().any(|m| m["start"] == 4 && m["end"] == 7));
}

#[test]
fn test_checksum_single_byte_is_empty() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("capture.csv");
    write_capture(&input, &[vec![0x42]]);

    let output = run(&ChecksumArgs::new(input.to_str().unwrap()));
    assert!(output.contains("Matches:           0"));
    assert!(output.contains("No checksum matches"));
}

#[test]
fn test_checksum_rejects_invalid_poly() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("capture.csv");
    write_capture(&input, &[vec![1, 2, 3]]);

    let mut args = ChecksumArgs::new(input.to_str().unwrap());
    args.algorithm = Some(AlgorithmArg::Crc8);
    args.poly = Some(0x1021);

    let mut out = Vec::new();
    let err = checksum::execute(&args, &InputOptions::default(), &mut out).unwrap_err();
    assert!(format!("{:#}", err).contains("poly"));
}

#[test]
fn test_checksum_missing_file() {
    let args = ChecksumArgs::new("/nonexistent/capture.csv");
    let mut out = Vec::new();
    assert!(checksum::execute(&args, &InputOptions::default(), &mut out).is_err());
}
