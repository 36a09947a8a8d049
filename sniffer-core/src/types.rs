//! Core types: captured bytes, streams and inferred packets

use crate::checksum::ChecksumCandidate;
use crate::error::AnalysisError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::time::Duration;

/// Line direction a byte was observed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Received from the target device
    Rx,
    /// Transmitted towards the target device
    Tx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rx => write!(f, "RX"),
            Direction::Tx => write!(f, "TX"),
        }
    }
}

/// One observed byte with its capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedByte {
    /// Position in the stream
    pub index: usize,

    /// Byte value
    pub value: u8,

    /// Monotonic capture timestamp in nanoseconds since capture start
    pub timestamp_ns: u64,
}

/// An immutable, ordered sequence of captured bytes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ByteStream {
    bytes: Vec<CapturedByte>,
    data: Bytes,
}

impl ByteStream {
    /// Build a stream from `(value, timestamp_ns)` pairs
    ///
    /// Fails if a timestamp is earlier than the one before it.
    pub fn from_samples<I>(samples: I) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = (u8, u64)>,
    {
        let mut bytes = Vec::new();
        let mut last_ts = 0u64;

        for (index, (value, timestamp_ns)) in samples.into_iter().enumerate() {
            if timestamp_ns < last_ts {
                return Err(AnalysisError::MalformedCapture {
                    line: index + 1,
                    reason: format!(
                        "timestamp {}ns goes backwards (previous {}ns)",
                        timestamp_ns, last_ts
                    ),
                });
            }
            last_ts = timestamp_ns;
            bytes.push(CapturedByte {
                index,
                value,
                timestamp_ns,
            });
        }

        let data = Bytes::from(bytes.iter().map(|b| b.value).collect::<Vec<u8>>());
        Ok(Self { bytes, data })
    }

    /// Build a stream of raw bytes spaced `interval` apart
    ///
    /// Timestamps saturate at `u64::MAX` nanoseconds.
    pub fn from_bytes_with_interval(data: &[u8], interval: Duration) -> Self {
        let step = u64::try_from(interval.as_nanos()).unwrap_or(u64::MAX);
        let bytes = data
            .iter()
            .enumerate()
            .map(|(index, &value)| CapturedByte {
                index,
                value,
                timestamp_ns: (index as u64).saturating_mul(step),
            })
            .collect();

        Self {
            bytes,
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Number of bytes in the stream
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the stream holds no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Captured bytes in order
    pub fn bytes(&self) -> &[CapturedByte] {
        &self.bytes
    }

    /// Contiguous byte values
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Zero-copy view of a byte range
    pub fn slice(&self, range: Range<usize>) -> Bytes {
        self.data.slice(range)
    }

    /// Gap in nanoseconds between byte `i` and byte `i + 1`, for every `i`
    pub fn gaps(&self) -> Vec<u64> {
        self.bytes
            .windows(2)
            .map(|w| w[1].timestamp_ns - w[0].timestamp_ns)
            .collect()
    }

    /// Time between the first and the last byte
    pub fn duration(&self) -> Duration {
        match (self.bytes.first(), self.bytes.last()) {
            (Some(first), Some(last)) => Duration::from_nanos(last.timestamp_ns - first.timestamp_ns),
            _ => Duration::ZERO,
        }
    }
}

/// Which boundary signal closed a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketSignal {
    /// A validated checksum window ends here
    Checksum,
    /// An inter-byte gap above threshold follows (or precedes) the packet
    Timing,
    /// The next occurrence of the framing pattern starts after it
    Sync,
    /// Leftover bytes bordered only by checksum-confirmed packets
    Residual,
    /// No boundary signal at all; the packet spans the whole stream
    Undelimited,
}

impl fmt::Display for PacketSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PacketSignal::Checksum => "checksum",
            PacketSignal::Timing => "timing",
            PacketSignal::Sync => "sync",
            PacketSignal::Residual => "residual",
            PacketSignal::Undelimited => "undelimited",
        };
        f.pad(s)
    }
}

/// An inferred message: a contiguous `[start, end)` range of a stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Packet {
    /// First byte offset (inclusive)
    pub start: usize,

    /// Last byte offset (exclusive)
    pub end: usize,

    /// Checksum that validated this packet, if any
    pub checksum: Option<ChecksumCandidate>,

    /// How certain the inferencer is about this segmentation, in [0, 1]
    pub confidence: f64,

    /// Signal that closed the packet
    pub signal: PacketSignal,
}

impl Packet {
    /// Length in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the packet covers no bytes
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Byte range covered
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Whether a checksum confirmed this packet
    pub fn is_confirmed(&self) -> bool {
        self.checksum.is_some()
    }
}

/// Ordered, non-overlapping packets produced by one inference pass
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct PacketSequence(Vec<Packet>);

impl PacketSequence {
    /// Wrap packets after checking they are non-empty, ordered and disjoint
    pub fn new(packets: Vec<Packet>) -> Result<Self, AnalysisError> {
        let mut previous_end = 0;
        for (i, packet) in packets.iter().enumerate() {
            if packet.is_empty() || (i > 0 && packet.start < previous_end) {
                return Err(AnalysisError::OverlappingPackets {
                    previous_end,
                    start: packet.start,
                });
            }
            previous_end = packet.end;
        }
        Ok(Self(packets))
    }

    /// An empty sequence
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Packets in order
    pub fn packets(&self) -> &[Packet] {
        &self.0
    }

    /// Number of packets
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no packets
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate packets in order
    pub fn iter(&self) -> std::slice::Iter<'_, Packet> {
        self.0.iter()
    }

    /// Consume into the inner vector
    pub fn into_inner(self) -> Vec<Packet> {
        self.0
    }
}

impl<'a> IntoIterator for &'a PacketSequence {
    type Item = &'a Packet;
    type IntoIter = std::slice::Iter<'a, Packet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
