//! CFA635 Serial Driver
//!
//! This crate drives a Crystalfontz CFA635 LCD module over a serial link,
//! built on the packet layer in [`cfa635_protocol`].
//!
//! # Architecture
//!
//! ```text
//!  transport ──► reader thread ──► framer/router thread ──┬──► report queue ──► read_report()
//!                                                         └──► response queue ─┐
//!  transport ◄──────────── raw_command() (single-flight lock) ◄────────────────┘
//! ```
//!
//! The read pipeline runs for the life of the connection, independent of any
//! command. Commands go through [`Module::raw_command`], which holds a lock
//! for the whole request/response round trip so that at most one request is
//! ever in flight.
//!
//! A lost connection is fatal: nothing is retried, buffered or replayed.
//!
//! # Example
//!
//! ```rust,no_run
//! use cfa635_driver::{serial, ConnectionConfig};
//! use cfa635_protocol::{transliterate, DisplayState};
//!
//! # fn main() -> cfa635_driver::LcdResult<()> {
//! let module = serial::open(&ConnectionConfig::default())?;
//! module.clear()?;
//!
//! let shown = DisplayState::cleared();
//! let mut next = shown;
//! next.put(0, 0, &transliterate("Hello, world!"));
//! module.update(&shown, &next)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod module;
mod pipeline;

#[cfg(feature = "serial")]
pub mod serial;

pub use config::*;
pub use error::*;
pub use module::*;
