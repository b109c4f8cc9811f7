//! Driver error types.

use thiserror::Error;

/// Errors returned by [`Module`](crate::Module) operations.
///
/// Validation errors are raised before anything is written to the module.
/// [`LcdError::Timeout`] and [`LcdError::Failed`] are kept distinct so callers
/// can treat a silent module differently from one that rejected a command.
#[derive(Debug, Error)]
pub enum LcdError {
    /// Command payload longer than the protocol allows.
    #[error("payload too large: maximum {max} bytes, got {actual}")]
    PayloadTooLarge {
        /// Maximum allowed length.
        max: usize,
        /// Length supplied.
        actual: usize,
    },

    /// Sprite slot outside 0..=7.
    #[error("sprite index {0} out of range")]
    SpriteIndex(usize),

    /// Sprite row with either of the two high bits set.
    #[error("invalid sprite: row {row} is 0b{value:08b}, upper two bits must be clear")]
    InvalidSprite {
        /// Offending row.
        row: usize,
        /// Its value.
        value: u8,
    },

    /// Write position off the display.
    #[error("position (column {col}, row {row}) out of range")]
    Position {
        /// Column requested.
        col: usize,
        /// Row requested.
        row: usize,
    },

    /// Backlight brightness above 100.
    #[error("backlight brightness out of range: lcd {lcd}, keypad {keypad}")]
    Backlight {
        /// LCD brightness requested.
        lcd: u8,
        /// Keypad brightness requested.
        keypad: u8,
    },

    /// LED index outside 0..=3.
    #[error("LED index {0} out of range")]
    LedIndex(usize),

    /// LED duty cycle above 100.
    #[error("LED duty cycle {0} out of range")]
    LedDuty(u8),

    /// No response arrived within the response timeout.
    #[error("timed out waiting for response")]
    Timeout,

    /// The module answered with an error or an unexpected response.
    #[error("command 0x{code:02X} failed")]
    Failed {
        /// Command that failed.
        code: u8,
    },

    /// The connection was closed or the read pipeline has stopped.
    #[error("connection closed")]
    Disconnected,

    /// Transport I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed or is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serial port could not be opened or configured.
    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Result type alias for driver operations.
pub type LcdResult<T> = Result<T, LcdError>;
