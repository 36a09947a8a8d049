//! Error types for capture analysis

use thiserror::Error;

/// Errors that can occur while loading or analysing a capture
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Capture file could not be read
    #[error("Failed to load capture: {0}")]
    Load(String),

    /// Capture file content could not be decoded
    #[error("Malformed capture at line {line}: {reason}")]
    MalformedCapture {
        /// 1-based line (or record) number
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Checksum configuration is structurally invalid
    #[error("Invalid algorithm parameter {parameter}: {reason}")]
    InvalidAlgorithmParameters {
        /// Name of the offending parameter
        parameter: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Stream too short to analyse
    #[error("Insufficient data: need at least {needed} bytes, got {actual}")]
    InsufficientData {
        /// Minimum number of bytes required
        needed: usize,
        /// Number of bytes available
        actual: usize,
    },

    /// Packet ranges overlap or are out of order
    #[error("Overlapping packets: packet starting at {start} begins before previous end {previous_end}")]
    OverlappingPackets {
        /// End offset of the previous packet
        previous_end: usize,
        /// Start offset of the offending packet
        start: usize,
    },
}

impl AnalysisError {
    /// Whether this condition should be surfaced as a warning with empty
    /// results instead of aborting the run
    pub fn is_warning(&self) -> bool {
        matches!(self, AnalysisError::InsufficientData { .. })
    }

    pub(crate) fn invalid_parameter(parameter: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidAlgorithmParameters {
            parameter,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Load(err.to_string())
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or_default();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => AnalysisError::Load(io.to_string()),
            kind => AnalysisError::MalformedCapture {
                line,
                reason: format!("{:?}", kind),
            },
        }
    }
}
