//! # SerialSniffer Core
//!
//! Packet and checksum inference for captured serial traffic.
//!
//! ## Modules
//!
//! - `constants`: Default thresholds and lookup tables
//! - `types`: Core types (CapturedByte, ByteStream, Packet, PacketSequence)
//! - `loader`: Capture file loading (recorder CSV, raw dumps)
//! - `checksum`: CRC8/CRC16/XOR/sum validation and sliding-window scanning
//! - `timing`: Inter-byte gap thresholds
//! - `boundary`: Packet boundary inference from timing and checksum signals
//! - `framing`: Sync pattern detection
//! - `baud`: Baud rate estimation from byte gaps or signal edges
//! - `stats`: Capture statistics
//! - `analysis`: End-to-end and batch analysis

#![warn(missing_docs)]

pub mod analysis;
pub mod baud;
pub mod boundary;
pub mod checksum;
pub mod constants;
pub mod error;
pub mod framing;
pub mod loader;
pub mod stats;
pub mod timing;
pub mod types;

// Re-export commonly used types
pub use analysis::{analyze_batch, analyze_stream, AnalysisConfig, CaptureReport};
pub use baud::BaudEstimate;
pub use boundary::{infer_packets, BoundaryInferencer, Inference, InferenceParams};
pub use checksum::{ChecksumAlgorithm, ChecksumCandidate, ChecksumKind, ChecksumScanner, CrcParams, ScanConfig};
pub use error::AnalysisError;
pub use loader::{load_file, CaptureFormat, LoadOptions};
pub use stats::{compute_statistics, CaptureStatistics, StatsConfig};
pub use types::{ByteStream, CapturedByte, Direction, Packet, PacketSequence, PacketSignal};

/// Result type alias for analysis operations
pub type Result<T> = core::result::Result<T, AnalysisError>;
