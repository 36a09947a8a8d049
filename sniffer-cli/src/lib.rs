//! Library entry for sniffer-cli used by integration tests and embedding.

pub mod commands;

// Re-export commands for convenience
pub use commands::*;

use anyhow::{Context, Result};
use sniffer_core::{load_file, ByteStream, CaptureFormat, ChecksumAlgorithm, Direction, LoadOptions};
use std::time::Duration;
use tracing::info;

/// Checksum algorithm accepted on the command line
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum AlgorithmArg {
    /// 8-bit CRC
    Crc8,
    /// 16-bit CRC
    Crc16,
    /// XOR of all payload bytes
    Xor,
    /// Sum of all payload bytes modulo 256
    Sum,
}

impl From<AlgorithmArg> for ChecksumAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Crc8 => ChecksumAlgorithm::Crc8,
            AlgorithmArg::Crc16 => ChecksumAlgorithm::Crc16,
            AlgorithmArg::Xor => ChecksumAlgorithm::Xor,
            AlgorithmArg::Sum => ChecksumAlgorithm::Sum,
        }
    }
}

/// Capture file format
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormatArg {
    /// Recorder CSV log
    Csv,
    /// Raw binary dump
    Raw,
}

impl From<InputFormatArg> for CaptureFormat {
    fn from(arg: InputFormatArg) -> Self {
        match arg {
            InputFormatArg::Csv => CaptureFormat::Csv,
            InputFormatArg::Raw => CaptureFormat::Raw,
        }
    }
}

/// Line direction filter
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DirectionArg {
    /// Bytes received from the device
    Rx,
    /// Bytes sent to the device
    Tx,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Rx => Direction::Rx,
            DirectionArg::Tx => Direction::Tx,
        }
    }
}

/// How every command reads its capture
#[derive(Clone, Debug, Default)]
pub struct InputOptions {
    /// Force a format instead of guessing from the extension
    pub format: Option<InputFormatArg>,
    /// Synthetic spacing of raw bytes, in microseconds
    pub byte_interval_us: u64,
    /// Keep only one direction
    pub direction: Option<DirectionArg>,
}

impl InputOptions {
    /// Core loader options
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            format: self.format.map(Into::into),
            byte_interval: Duration::from_micros(self.byte_interval_us),
            direction: self.direction.map(Into::into),
        }
    }

    /// Load `input` into a byte stream
    pub fn load(&self, input: &str) -> Result<ByteStream> {
        info!("Loading capture: {}", input);
        let stream = load_file(input, &self.load_options())
            .with_context(|| format!("Failed to load capture: {}", input))?;
        info!("Loaded {} bytes", stream.len());
        Ok(stream)
    }
}

/// Parse a 16-bit value written in hex (`0x1021`, `1021`)
pub fn parse_hex_u16(s: &str) -> std::result::Result<u16, String> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value '{}': {}", s, e))
}

/// Parse a byte pattern written in hex (`AA55`, `0xAA55`, `aa 55`)
pub fn parse_hex_bytes(s: &str) -> std::result::Result<Vec<u8>, String> {
    let compact: String = s.split_whitespace().collect();
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    let bytes = hex::decode(digits).map_err(|e| format!("invalid hex pattern '{}': {}", s, e))?;
    if bytes.is_empty() {
        return Err("pattern is empty".to_string());
    }
    Ok(bytes)
}

/// Hex preview of at most `max` bytes
pub fn hex_preview(bytes: &[u8], max: usize) -> String {
    if bytes.len() > max {
        format!("{}…", hex::encode(&bytes[..max]))
    } else {
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u16() {
        assert_eq!(parse_hex_u16("0x1021"), Ok(0x1021));
        assert_eq!(parse_hex_u16("8005"), Ok(0x8005));
        assert!(parse_hex_u16("0x10000").is_err());
        assert!(parse_hex_u16("zz").is_err());
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("AA55"), Ok(vec![0xAA, 0x55]));
        assert_eq!(parse_hex_bytes("0xaa 55"), Ok(vec![0xAA, 0x55]));
        assert!(parse_hex_bytes("A").is_err());
        assert!(parse_hex_bytes("").is_err());
    }

    #[test]
    fn test_hex_preview() {
        assert_eq!(hex_preview(&[1, 2, 3], 4), "010203");
        assert_eq!(hex_preview(&[1, 2, 3], 2), "0102…");
    }

    #[test]
    fn test_load_options() {
        let opts = InputOptions {
            format: Some(InputFormatArg::Raw),
            byte_interval_us: 250,
            direction: Some(DirectionArg::Tx),
        };
        let load = opts.load_options();
        assert_eq!(load.format, Some(CaptureFormat::Raw));
        assert_eq!(load.byte_interval, Duration::from_micros(250));
        assert_eq!(load.direction, Some(Direction::Tx));
    }
}
