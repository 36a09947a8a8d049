//! Command implementations
//!
//! Every command writes its report to an explicit output sink so it can be
//! driven from tests with an in-memory buffer.

pub mod analyze;
pub mod baud;
pub mod checksum;
pub mod packets;
pub mod stats;
