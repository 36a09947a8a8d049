use sniffer_cli::commands::analyze::{self, AnalyzeArgs};
use sniffer_cli::InputOptions;
use sniffer_core::ChecksumKind;
use std::fs;
use tempfile::tempdir;

/// Helper: write sum-terminated frames with idle time between them
fn write_capture(path: &std::path::Path, payloads: &[&[u8]]) {
    let mut csv = String::from("Timestamp,Direction,Value_Hex,Value_ASCII,Status\n");
    let mut t = 0u32;
    for payload in payloads {
        for b in ChecksumKind::Sum.frame(payload) {
            csv.push_str(&format!("{},RX,0x{:02X},.,OK\n", t, b));
            t += 1;
        }
        t += 25;
    }
    fs::write(path, csv).unwrap();
}

#[test]
fn test_analyze_multiple_inputs() {
    colored::control::set_override(false);
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");
    let report = dir.path().join("report.json");

    write_capture(&first, &[&[0xAA, 0x01, 0x10], &[0xAA, 0x02, 0x20, 0x21], &[0xAA, 0x03, 0x30]]);
    write_capture(&second, &[&[0x42]]);

    let args = AnalyzeArgs {
        inputs: vec![
            first.to_str().unwrap().to_string(),
            second.to_str().unwrap().to_string(),
        ],
        output: Some(report.to_str().unwrap().to_string()),
    };
    let mut out = Vec::new();
    analyze::execute(&args, &InputOptions::default(), &mut out).unwrap();
    let output = String::from_utf8(out).unwrap();

    assert!(output.contains("first.csv"));
    assert!(output.contains("second.csv"));
    assert!(output.contains("Checksum: sum"));
    assert!(output.contains("Sync pattern: aa"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0]["input"].as_str().unwrap().ends_with("first.csv"));
    assert_eq!(entries[0]["statistics"]["total_packets"], 3);
    assert_eq!(entries[1]["statistics"]["total_bytes"], 2);
}

#[test]
fn test_analyze_fails_on_missing_input() {
    let args = AnalyzeArgs {
        inputs: vec!["/nonexistent/a.csv".to_string()],
        output: None,
    };
    let mut out = Vec::new();
    assert!(analyze::execute(&args, &InputOptions::default(), &mut out).is_err());
}
