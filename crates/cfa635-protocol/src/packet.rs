//! Packet representation and wire encoding.
//!
//! ```text
//! +------+--------+-------------------+--------+--------+
//! | type | length | data[0..length]   | crc_lo | crc_hi |
//! +------+--------+-------------------+--------+--------+
//! ```

use bytes::BufMut;

use crate::checksum::{checksum, strip_and_verify};
use crate::constants::*;
use crate::error::FrameError;

/// Which of the four packet classes a type byte belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketClass {
    /// Host to module command.
    Command,
    /// Successful response to a command.
    Response,
    /// Asynchronous report from the module.
    Report,
    /// Failed response to a command.
    Error,
}

impl PacketClass {
    /// Classify a type byte by its top two bits.
    pub fn of(kind: u8) -> Self {
        match (kind & CLASS_MASK) >> 6 {
            CLASS_COMMAND => PacketClass::Command,
            CLASS_RESPONSE => PacketClass::Response,
            CLASS_REPORT => PacketClass::Report,
            _ => PacketClass::Error,
        }
    }
}

/// A single CRC-verified packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The type byte: class bits plus command, response or report code.
    pub kind: u8,
    /// Data bytes, at most [`MAX_DATA_LEN`].
    pub data: Vec<u8>,
}

impl Packet {
    /// Create a packet. Returns `None` if `data` is longer than
    /// [`MAX_DATA_LEN`].
    pub fn new(kind: u8, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_DATA_LEN {
            return None;
        }
        Some(Packet {
            kind,
            data: data.to_vec(),
        })
    }

    /// The packet class encoded in the type byte.
    pub fn class(&self) -> PacketClass {
        PacketClass::of(self.kind)
    }

    /// Whether the device sent this packet unsolicited.
    pub fn is_report(&self) -> bool {
        self.class() == PacketClass::Report
    }

    /// Encode for transmission, CRC included.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.data.len() + CRC_LEN);
        buf.put_u8(self.kind);
        buf.put_u8(self.data.len() as u8);
        buf.extend_from_slice(&self.data);
        let crc = checksum(&buf);
        buf.put_u16_le(crc);
        buf
    }

    /// Decode exactly one complete frame.
    ///
    /// Unlike the [`Framer`](crate::Framer), this does not resynchronize: the
    /// buffer must hold one whole packet and nothing else.
    pub fn decode(frame: &[u8]) -> Result<Self, FrameError> {
        if frame.len() < HEADER_LEN + CRC_LEN {
            return Err(FrameError::Truncated {
                expected: HEADER_LEN + CRC_LEN,
                actual: frame.len(),
            });
        }

        let len = frame[1];
        if len as usize > MAX_DATA_LEN {
            return Err(FrameError::LengthTooLarge(len));
        }

        let expected = HEADER_LEN + len as usize + CRC_LEN;
        if frame.len() != expected {
            return Err(FrameError::Truncated {
                expected,
                actual: frame.len(),
            });
        }

        let (body, ok) = strip_and_verify(frame);
        if !ok {
            return Err(FrameError::BadCrc);
        }

        Ok(Packet {
            kind: body[0],
            data: body[HEADER_LEN..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_type_bytes() {
        assert_eq!(PacketClass::of(CMD_WRITE), PacketClass::Command);
        assert_eq!(PacketClass::of(0x5F), PacketClass::Response);
        assert_eq!(PacketClass::of(REPORT_KEY_ACTIVITY), PacketClass::Report);
        assert_eq!(PacketClass::of(REPORT_TEMPERATURE), PacketClass::Report);
        assert_eq!(PacketClass::of(0xDF), PacketClass::Error);
    }

    #[test]
    fn test_encode_layout() {
        let packet = Packet::new(CMD_SET_BACKLIGHT, &[50, 0]).unwrap();
        let wire = packet.encode();
        assert_eq!(wire.len(), 6);
        assert_eq!(&wire[..4], &[0x0E, 2, 50, 0]);
        assert_eq!(u16::from_le_bytes([wire[4], wire[5]]), checksum(&wire[..4]));
    }

    #[test]
    fn test_new_rejects_oversize_data() {
        assert!(Packet::new(CMD_WRITE, &[0; MAX_DATA_LEN]).is_some());
        assert!(Packet::new(CMD_WRITE, &[0; MAX_DATA_LEN + 1]).is_none());
    }

    #[test]
    fn test_decode_encoded() {
        let packet = Packet::new(0x40, b"ping").unwrap();
        assert_eq!(Packet::decode(&packet.encode()), Ok(packet));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            Packet::decode(&[0x40, 0x00]),
            Err(FrameError::Truncated { .. })
        ));
        assert_eq!(
            Packet::decode(&[0x40, 23, 0, 0]),
            Err(FrameError::LengthTooLarge(23))
        );

        let mut wire = Packet::new(0x46, &[]).unwrap().encode();
        wire[2] ^= 0xFF;
        assert_eq!(Packet::decode(&wire), Err(FrameError::BadCrc));
    }
}
