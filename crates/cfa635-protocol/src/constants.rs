//! Protocol constants
//!
//! Command codes, report tags, packet limits and display geometry for the
//! CFA635 packet protocol.

use std::time::Duration;

// ============================================================================
// Packet Limits
// ============================================================================

/// Maximum number of data bytes in a single packet.
pub const MAX_DATA_LEN: usize = 22;
/// Size of the type and length header.
pub const HEADER_LEN: usize = 2;
/// Size of the trailing CRC.
pub const CRC_LEN: usize = 2;
/// Largest possible packet on the wire.
pub const MAX_PACKET_LEN: usize = HEADER_LEN + MAX_DATA_LEN + CRC_LEN;

/// Maximum ping payload the module will echo.
pub const MAX_PING_LEN: usize = 16;

// ============================================================================
// Packet Classes (top two bits of the type byte)
// ============================================================================

/// Mask selecting the class bits of a type byte.
pub const CLASS_MASK: u8 = 0b1100_0000;
/// Host to module command.
pub const CLASS_COMMAND: u8 = 0b00;
/// Normal response to a command.
pub const CLASS_RESPONSE: u8 = 0b01;
/// Asynchronous report from the module.
pub const CLASS_REPORT: u8 = 0b10;
/// Error response to a command.
pub const CLASS_ERROR: u8 = 0b11;

/// Bit set in the type byte of a successful response.
pub const RESPONSE_FLAG: u8 = 0x40;

// ============================================================================
// Command Codes (host → module)
// ============================================================================

/// Echo the payload back.
pub const CMD_PING: u8 = 0x00;
/// Clear the LCD to spaces.
pub const CMD_CLEAR: u8 = 0x06;
/// Load a sprite into character generator RAM.
pub const CMD_SET_SPRITE: u8 = 0x09;
/// Set LCD and keypad backlight brightness.
pub const CMD_SET_BACKLIGHT: u8 = 0x0E;
/// Write characters at a position.
pub const CMD_WRITE: u8 = 0x1F;
/// Set a GPIO (LED) duty cycle.
pub const CMD_SET_GPIO: u8 = 0x22;

/// Response code the module sends when `code` succeeds.
pub const fn response_code(code: u8) -> u8 {
    code | RESPONSE_FLAG
}

// ============================================================================
// Report Tags (module → host)
// ============================================================================

/// A key was pressed or released.
pub const REPORT_KEY_ACTIVITY: u8 = 0x80;
/// Fan tachometer reading.
pub const REPORT_FAN_SPEED: u8 = 0x81;
/// Temperature sensor reading.
pub const REPORT_TEMPERATURE: u8 = 0x82;

// ============================================================================
// Display Geometry
// ============================================================================

/// Rows on the LCD.
pub const ROWS: usize = 4;
/// Columns on the LCD.
pub const COLUMNS: usize = 20;
/// Programmable character slots (codepoints 0x00..=0x07).
pub const SPRITE_SLOTS: usize = 8;
/// Pixel rows in a sprite.
pub const SPRITE_HEIGHT: usize = 8;
/// A 6x8 glyph, one byte per pixel row, most significant used bit leftmost.
pub type Sprite = [u8; SPRITE_HEIGHT];
/// Bits of a sprite row that may be set.
pub const SPRITE_ROW_MASK: u8 = 0b0011_1111;
/// Bicolor LEDs beside the LCD.
pub const LED_COUNT: usize = 4;
/// Maximum backlight brightness and LED duty cycle.
pub const MAX_LEVEL: u8 = 100;
/// The space codepoint; a cleared display holds it in every cell.
pub const SPACE: u8 = 0x20;

// ============================================================================
// Timing
// ============================================================================

/// How long the rest of a packet may take once its type byte has arrived.
pub const DEFAULT_PACKET_TIMEOUT: Duration = Duration::from_millis(250);
/// How long to wait for the response to a command.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(250);
