//! Protocol error types.

use thiserror::Error;

/// Reasons a packet was discarded while being assembled from the byte stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The length byte exceeded the 22-byte data limit.
    #[error("data length {0} exceeds maximum of 22")]
    LengthTooLarge(u8),

    /// The CRC did not match the packet contents.
    #[error("CRC mismatch")]
    BadCrc,

    /// The packet did not complete within the packet timeout.
    #[error("timed out after {received} bytes")]
    Timeout {
        /// Bytes of the partial packet received before the timeout.
        received: usize,
    },

    /// A complete frame was expected but the buffer ended early.
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes the header promised.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },
}

/// Reasons a report packet could not be turned into a [`Report`](crate::Report).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// The type byte is in the report class but is not a known report.
    #[error("unknown report type 0x{0:02X}")]
    UnknownReportType(u8),

    /// Key activity report for a key code outside 1..=12.
    #[error("key activity report: unknown key {0}")]
    UnknownKey(u8),

    /// Fan report with all-zero readings: the fan board is disconnected.
    #[error("fan speed report: fan module absent on sensor {sensor}")]
    FanModuleAbsent {
        /// Fan index from the report.
        sensor: u8,
    },

    /// Temperature report whose status byte flags a sensor fault.
    #[error("temperature report: sensor {sensor} fault")]
    SensorFault {
        /// Sensor index from the report.
        sensor: u8,
    },

    /// Report carried fewer data bytes than its layout requires.
    #[error("report 0x{kind:02X} truncated: {len} data bytes")]
    Truncated {
        /// Report type byte.
        kind: u8,
        /// Data bytes actually present.
        len: usize,
    },
}
