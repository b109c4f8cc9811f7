//! CRC-16/X-25 packet checksum.
//!
//! The CFA635 protects every packet with the X.25 variant of CRC-CCITT:
//! polynomial 0x1021, initial value 0xFFFF, reflected input and output,
//! final XOR 0xFFFF. The checksum is carried little-endian after the data.

use bytes::BufMut;
use crc::{Crc, CRC_16_IBM_SDLC};

use crate::constants::CRC_LEN;

/// CRC-16/X-25 calculator with 256-entry lookup table.
const X25: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Calculate the CRC-16/X-25 of a byte slice.
#[inline]
#[must_use]
pub fn checksum(data: &[u8]) -> u16 {
    X25.checksum(data)
}

/// Return `data` followed by its little-endian checksum.
pub fn append(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.len() + CRC_LEN);
    buf.extend_from_slice(data);
    buf.put_u16_le(checksum(data));
    buf
}

/// Split the trailing little-endian checksum off `frame`.
///
/// Returns the bytes preceding the checksum and whether the checksum matches
/// them. A buffer too short to hold a checksum is returned unchanged and
/// reported as invalid.
pub fn strip_and_verify(frame: &[u8]) -> (&[u8], bool) {
    if frame.len() < CRC_LEN {
        return (frame, false);
    }

    let (body, tail) = frame.split_at(frame.len() - CRC_LEN);
    let expected = u16::from_le_bytes([tail[0], tail[1]]);
    (body, checksum(body) == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_checksum_check_value() {
        // Standard check value for CRC-16/X-25.
        assert_eq!(checksum(b"123456789"), 0x906E);
    }

    #[test]
    fn test_append_is_little_endian() {
        let framed = append(b"123456789");
        assert_eq!(&framed[9..], &[0x6E, 0x90]);
    }

    #[test]
    fn test_strip_and_verify_short_buffers() {
        let empty: &[u8] = &[];
        assert_eq!(strip_and_verify(empty), (empty, false));
        let one: &[u8] = &[0x42];
        assert_eq!(strip_and_verify(one), (one, false));
    }

    #[test]
    fn test_strip_and_verify_empty_body() {
        let framed = append(&[]);
        assert_eq!(framed.len(), 2);
        let (body, ok) = strip_and_verify(&framed);
        assert!(ok);
        assert!(body.is_empty());
    }

    #[test]
    fn test_corrupted_crc_rejected() {
        let mut framed = append(&[0x1F, 0x03, 0x00, 0x00, b'A']);
        let last = framed.len() - 1;
        framed[last] ^= 0x01;
        let (body, ok) = strip_and_verify(&framed);
        assert!(!ok);
        assert_eq!(body, &[0x1F, 0x03, 0x00, 0x00, b'A']);
    }

    proptest! {
        #[test]
        fn prop_round_trip(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let framed = append(&data);
            let (body, ok) = strip_and_verify(&framed);
            prop_assert!(ok);
            prop_assert_eq!(body, &data[..]);
        }

        #[test]
        fn prop_single_bit_flip_detected(
            data in proptest::collection::vec(any::<u8>(), 0..24),
            bit in any::<proptest::sample::Index>(),
        ) {
            let mut framed = append(&data);
            let bit = bit.index(framed.len() * 8);
            framed[bit / 8] ^= 1 << (bit % 8);
            let (_, ok) = strip_and_verify(&framed);
            prop_assert!(!ok);
        }
    }
}
