//! Packet assembly from a raw byte stream.
//!
//! The CFA635 protocol has no start-of-frame marker, so the framer treats the
//! first byte it sees while idle as a type byte. Once a type byte has arrived
//! the rest of the packet must follow within the packet timeout; a stalled,
//! oversized or corrupted packet is discarded and the framer goes back to
//! waiting for a type byte.
//!
//! The framer never reads a clock itself. Callers pass the arrival time of
//! each byte and call [`Framer::expire`] when [`Framer::deadline`] passes
//! with no input, which keeps the state machine deterministic under test.

use std::time::{Duration, Instant};

use bytes::{BufMut, BytesMut};

use crate::checksum::strip_and_verify;
use crate::constants::*;
use crate::error::FrameError;
use crate::packet::Packet;

/// Where the framer is within the current packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Idle, the next byte is a type byte.
    AwaitingType,
    /// Type byte received, the next byte is the data length.
    AwaitingLength,
    /// Collecting data and CRC bytes.
    AwaitingBody {
        /// Data and CRC bytes still to come.
        remaining: usize,
    },
}

/// Byte-at-a-time packet assembler.
#[derive(Debug)]
pub struct Framer {
    state: FramerState,
    buffer: BytesMut,
    deadline: Option<Instant>,
    timeout: Duration,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(DEFAULT_PACKET_TIMEOUT)
    }
}

impl Framer {
    /// Create a framer with the given per-packet timeout.
    pub fn new(timeout: Duration) -> Self {
        Framer {
            state: FramerState::AwaitingType,
            buffer: BytesMut::with_capacity(MAX_PACKET_LEN),
            deadline: None,
            timeout,
        }
    }

    /// Current assembly state.
    pub fn state(&self) -> FramerState {
        self.state
    }

    /// The per-packet timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// When the partial packet expires, or `None` while idle.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Number of bytes of the partial packet held so far.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Discard any partial packet.
    pub fn reset(&mut self) {
        self.state = FramerState::AwaitingType;
        self.buffer.clear();
        self.deadline = None;
    }

    /// Discard the partial packet if its deadline has passed at `now`.
    pub fn expire(&mut self, now: Instant) -> Option<FrameError> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                let received = self.buffer.len();
                self.reset();
                Some(FrameError::Timeout { received })
            }
            _ => None,
        }
    }

    /// Feed one byte that arrived at `now`.
    ///
    /// Returns `Some(Ok(packet))` when the byte completes a valid packet and
    /// `Some(Err(_))` when a packet was discarded. A byte arriving after the
    /// deadline expires the stale partial packet and then starts a new one.
    pub fn push(&mut self, byte: u8, now: Instant) -> Option<Result<Packet, FrameError>> {
        let expired = self.expire(now);

        let outcome = match self.state {
            FramerState::AwaitingType => {
                self.buffer.put_u8(byte);
                self.state = FramerState::AwaitingLength;
                self.deadline = Some(now + self.timeout);
                None
            }
            FramerState::AwaitingLength => {
                if byte as usize > MAX_DATA_LEN {
                    self.reset();
                    Some(Err(FrameError::LengthTooLarge(byte)))
                } else {
                    self.buffer.put_u8(byte);
                    self.state = FramerState::AwaitingBody {
                        remaining: byte as usize + CRC_LEN,
                    };
                    None
                }
            }
            FramerState::AwaitingBody { remaining } => {
                self.buffer.put_u8(byte);
                if remaining > 1 {
                    self.state = FramerState::AwaitingBody {
                        remaining: remaining - 1,
                    };
                    None
                } else {
                    Some(self.finish())
                }
            }
        };

        match expired {
            Some(err) => Some(Err(err)),
            None => outcome,
        }
    }

    /// Feed a chunk of bytes that arrived together, collecting every outcome.
    pub fn push_slice(&mut self, bytes: &[u8], now: Instant) -> Vec<Result<Packet, FrameError>> {
        bytes
            .iter()
            .filter_map(|&byte| self.push(byte, now))
            .collect()
    }

    fn finish(&mut self) -> Result<Packet, FrameError> {
        let frame = self.buffer.split().freeze();
        self.reset();

        let (body, ok) = strip_and_verify(&frame);
        if !ok {
            log::trace!("bad CRC on frame {:02X?}", &frame[..]);
            return Err(FrameError::BadCrc);
        }
        Ok(Packet {
            kind: body[0],
            data: body[HEADER_LEN..].to_vec(),
        })
    }
}
