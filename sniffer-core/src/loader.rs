//! Capture file loading
//!
//! Two input formats are understood:
//!
//! - **CSV** as written by the SerialSniffer recorder:
//!   `Timestamp,Direction,Value_Hex,Value_ASCII,Status`, one byte per row,
//!   timestamp in milliseconds since capture start.
//! - **Raw** binary dumps with no timing; bytes are spaced by a fixed
//!   synthetic interval.
//!
//! The recorder writes the ASCII column unescaped, so a captured `,` or `"`
//! shows up verbatim. Quoting is disabled and only the first three columns
//! are read.

use crate::error::AnalysisError;
use crate::types::{ByteStream, Direction};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "logging")]
use tracing::{debug, info};

/// Expected first header column of a CSV capture
const CSV_TIMESTAMP_HEADER: &str = "Timestamp";

/// Supported capture encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureFormat {
    /// Recorder CSV log
    Csv,
    /// Raw bytes, no timing
    Raw,
}

/// How to load a capture
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadOptions {
    /// Force a format instead of guessing from the extension
    pub format: Option<CaptureFormat>,

    /// Synthetic spacing between raw bytes
    pub byte_interval: Duration,

    /// Keep only bytes seen in this direction (CSV only)
    pub direction: Option<Direction>,
}

impl LoadOptions {
    /// Force `format`
    pub fn format(mut self, format: CaptureFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Space raw bytes `interval` apart
    pub fn byte_interval(mut self, interval: Duration) -> Self {
        self.byte_interval = interval;
        self
    }

    /// Keep only `direction`
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }
}

/// Guess the capture format from a file extension
pub fn detect_format(path: &Path) -> CaptureFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("csv") | Some("txt") | Some("log") => CaptureFormat::Csv,
        _ => CaptureFormat::Raw,
    }
}

/// Load a capture file into a byte stream
pub fn load_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<ByteStream> {
    let path = path.as_ref();
    let data = fs::read(path)
        .map_err(|e| AnalysisError::Load(format!("{}: {}", path.display(), e)))?;

    let format = options.format.unwrap_or_else(|| detect_format(path));

    #[cfg(feature = "logging")]
    info!("Loading {} ({} bytes, {:?})", path.display(), data.len(), format);

    load_bytes(&data, format, options)
}

/// Decode capture content already in memory
pub fn load_bytes(data: &[u8], format: CaptureFormat, options: &LoadOptions) -> Result<ByteStream> {
    match format {
        CaptureFormat::Csv => parse_csv(data, options.direction),
        CaptureFormat::Raw => Ok(ByteStream::from_bytes_with_interval(data, options.byte_interval)),
    }
}

fn parse_csv(data: &[u8], direction: Option<Direction>) -> Result<ByteStream> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(data);

    let header_ok = reader
        .headers()?
        .get(0)
        .map(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(CSV_TIMESTAMP_HEADER))
        .unwrap_or(true);
    if !header_ok {
        return Err(AnalysisError::MalformedCapture {
            line: 1,
            reason: format!("expected header starting with '{}'", CSV_TIMESTAMP_HEADER),
        });
    }

    let mut samples = Vec::new();
    let mut last_ts = 0u64;
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or_default();

        if record.iter().all(str::is_empty) {
            continue;
        }

        let field = |i: usize, name: &str| {
            record.get(i).ok_or_else(|| AnalysisError::MalformedCapture {
                line,
                reason: format!("missing {} column", name),
            })
        };

        let timestamp_ns = parse_timestamp_ms(field(0, "Timestamp")?, line)?;
        let dir = parse_direction(field(1, "Direction")?, line)?;
        let value = parse_hex_byte(field(2, "Value_Hex")?, line)?;

        if timestamp_ns < last_ts {
            return Err(AnalysisError::MalformedCapture {
                line,
                reason: format!("timestamp goes backwards ({}ns < {}ns)", timestamp_ns, last_ts),
            });
        }
        last_ts = timestamp_ns;

        if direction.is_some_and(|d| d != dir) {
            skipped += 1;
            continue;
        }
        samples.push((value, timestamp_ns));
    }

    #[cfg(feature = "logging")]
    debug!("Parsed {} CSV bytes ({} filtered by direction)", samples.len(), skipped);
    #[cfg(not(feature = "logging"))]
    let _ = skipped;

    ByteStream::from_samples(samples)
}

fn parse_timestamp_ms(s: &str, line: usize) -> Result<u64> {
    let ms: f64 = s.parse().map_err(|_| AnalysisError::MalformedCapture {
        line,
        reason: format!("invalid timestamp '{}'", s),
    })?;
    if !ms.is_finite() || ms < 0.0 {
        return Err(AnalysisError::MalformedCapture {
            line,
            reason: format!("timestamp '{}' out of range", s),
        });
    }
    Ok((ms * 1_000_000.0).round() as u64)
}

fn parse_direction(s: &str, line: usize) -> Result<Direction> {
    if s.eq_ignore_ascii_case("rx") {
        Ok(Direction::Rx)
    } else if s.eq_ignore_ascii_case("tx") {
        Ok(Direction::Tx)
    } else {
        Err(AnalysisError::MalformedCapture {
            line,
            reason: format!("unknown direction '{}'", s),
        })
    }
}

fn parse_hex_byte(s: &str, line: usize) -> Result<u8> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(digits, 16).map_err(|_| AnalysisError::MalformedCapture {
        line,
        reason: format!("invalid byte value '{}'", s),
    })
}
