//! CFA635 Packet Protocol
//!
//! This crate provides the thread-free half of a driver for Crystalfontz
//! CFA635 character LCD modules (4 rows by 20 columns, eight programmable
//! sprite slots, backlight, four bicolor LEDs and a six-key keypad).
//!
//! # Protocol Overview
//!
//! Every message in either direction is a packet:
//!
//! ```text
//! +------+--------+-------------------+--------+--------+
//! | type | length | data[0..length]   | crc_lo | crc_hi |
//! +------+--------+-------------------+--------+--------+
//! ```
//!
//! - `length` is at most 22.
//! - The CRC is CRC-16/X-25 over `type`, `length` and `data`, little-endian.
//! - The top two bits of `type` classify the packet: `0b00` host command,
//!   `0b01` normal response, `0b10` device report, `0b11` error response.
//!
//! The host sends one command at a time; the module answers with
//! `code | 0x40`. Reports (key presses, fan tachometers, temperatures) arrive
//! asynchronously and are unrelated to any command.
//!
//! # Example
//!
//! ```rust
//! use cfa635_protocol::{transliterate, DisplayState, diff};
//!
//! let old = DisplayState::cleared();
//! let mut new = DisplayState::cleared();
//! new.put(2, 1, &transliterate("Hello"));
//!
//! let writes = diff(&old, &new);
//! assert_eq!(writes.len(), 1);
//! assert_eq!(writes[0].col, 2);
//! ```

mod charset;
mod checksum;
mod constants;
mod error;
mod framer;
mod packet;
mod report;
mod state;

pub use charset::*;
pub use checksum::*;
pub use constants::*;
pub use error::*;
pub use framer::*;
pub use packet::*;
pub use report::*;
pub use state::*;
