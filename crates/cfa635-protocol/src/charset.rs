//! Unicode to CFA635 character set transliteration.
//!
//! The CFA635 character ROM is a single-byte set: roughly ASCII in the
//! printable range, with accented Latin, Greek, arrows, music symbols and
//! block elements scattered through the upper half. Codepoints 0x00..=0x07
//! (mirrored at 0x08..=0x0F) show the programmable sprites.
//!
//! Transliteration is lossy: many Unicode characters map onto the same
//! device byte (U+00DF LATIN SMALL LETTER SHARP S and U+03B2 GREEK SMALL
//! LETTER BETA both become 0xBE), and anything without a reasonable
//! stand-in becomes [`REPLACEMENT`], the device's inverted question mark.
//! The output never contains 0x00..=0x0F, so text can't accidentally show
//! a sprite.

/// Device byte for `¿`, used for characters with no mapping.
pub const REPLACEMENT: u8 = 0x60;

/// Whether `c` is shown by the device at its own ASCII value.
///
/// Only part of printable ASCII qualifies: `$`, `@`, brackets, braces,
/// `\`, `^`, `_`, `` ` ``, `|` and `~` sit elsewhere in the device ROM.
pub fn is_identity(c: char) -> bool {
    matches!(c, '\u{20}'..='\u{23}' | '\u{25}'..='\u{3F}' | 'A'..='Z' | 'a'..='z')
}

/// Transliterate a single character.
pub fn encode_char(c: char) -> u8 {
    if is_identity(c) {
        return c as u8;
    }
    match CHARSET.binary_search_by_key(&c, |&(from, _)| from) {
        Ok(i) => CHARSET[i].1,
        Err(_) => REPLACEMENT,
    }
}

/// Transliterate text, one device byte per `char`.
pub fn transliterate(text: &str) -> Vec<u8> {
    text.chars().map(encode_char).collect()
}

/// Outcome of [`encode_utf8`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStatus {
    /// All input was consumed.
    Complete,
    /// The input ends inside a UTF-8 sequence; feed the unconsumed tail again
    /// with more bytes appended.
    NeedMoreInput,
}

/// Transliterate raw UTF-8 bytes into `dst`.
///
/// Returns how many bytes of `src` were consumed. A sequence cut off at the
/// end of `src` is left unconsumed unless `at_eof` is set, in which case it
/// becomes one [`REPLACEMENT`] byte. Invalid sequences also become one
/// [`REPLACEMENT`] byte each.
pub fn encode_utf8(src: &[u8], dst: &mut Vec<u8>, at_eof: bool) -> (usize, EncodeStatus) {
    let mut consumed = 0;
    loop {
        let rest = &src[consumed..];
        match std::str::from_utf8(rest) {
            Ok(text) => {
                dst.extend(text.chars().map(encode_char));
                return (src.len(), EncodeStatus::Complete);
            }
            Err(e) => {
                let valid = e.valid_up_to();
                let text = std::str::from_utf8(&rest[..valid]).unwrap_or_default();
                dst.extend(text.chars().map(encode_char));
                consumed += valid;

                match e.error_len() {
                    Some(bad) => {
                        dst.push(REPLACEMENT);
                        consumed += bad;
                    }
                    None if at_eof => {
                        dst.push(REPLACEMENT);
                        return (src.len(), EncodeStatus::Complete);
                    }
                    None => return (consumed, EncodeStatus::NeedMoreInput),
                }
            }
        }
    }
}

/// Streaming transliterator for UTF-8 arriving in arbitrary chunks.
///
/// Holds back a UTF-8 sequence split across chunk boundaries until the rest
/// of it arrives.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    pending: Vec<u8>,
}

impl Encoder {
    /// Create an encoder with no pending input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transliterate `chunk`, appending device bytes to `out`.
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> EncodeStatus {
        self.pending.extend_from_slice(chunk);
        let (consumed, status) = encode_utf8(&self.pending, out, false);
        self.pending.drain(..consumed);
        status
    }

    /// Flush any incomplete trailing sequence as a replacement byte.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        encode_utf8(&self.pending, out, true);
        self.pending.clear();
    }

    /// Bytes held back waiting for the rest of a sequence.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Forget any held-back input.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

/// Characters outside the identity range, sorted by code point.
static CHARSET: &[(char, u8)] = &[
    ('$', 0xA2),
    ('@', 0xA0),
    ('[', 0xFA),
    ('\\', 0xFB),
    (']', 0xFC),
    ('^', 0x1D),
    ('_', 0xC4),
    ('{', 0xFD),
    ('|', 0xFE),
    ('}', 0xFF),
    ('~', 0xCE),
    ('\u{A0}', 0x20), // no-break space
    ('¡', 0x40),
    ('¢', 0xB1),
    ('£', 0xA1),
    ('¤', 0x24),
    ('¥', 0xA3),
    ('§', 0x5D),
    ('«', 0x14),
    ('°', 0x80),
    ('±', 0x8C),
    ('²', 0x82),
    ('³', 0x83),
    ('µ', 0x8F),
    ('¹', 0x81),
    ('»', 0x15),
    ('¼', 0x8B),
    ('½', 0x8A),
    ('¿', 0x60),
    ('Á', 0xE2),
    ('Ä', 0x5B),
    ('Å', 0xAE),
    ('Æ', 0xBC),
    ('Ç', 0xA9),
    ('È', 0xC5),
    ('É', 0xBF),
    ('Ê', 0xC6),
    ('Í', 0xE3),
    ('Ñ', 0x5D),
    ('Ó', 0xE4),
    ('Ô', 0xEC),
    ('Ö', 0x5C),
    ('Ø', 0xAB),
    ('Ú', 0xE5),
    ('Ü', 0x5E),
    ('Ý', 0xE6),
    ('ß', 0xBE),
    ('à', 0x7F),
    ('á', 0xE7),
    ('ä', 0x7B),
    ('å', 0xAF),
    ('æ', 0xBD),
    ('ç', 0xC8),
    ('è', 0xA4),
    ('é', 0xA5),
    ('ê', 0xC7),
    ('ì', 0xA7),
    ('í', 0xE8),
    ('ñ', 0x7D),
    ('ò', 0xA8),
    ('ó', 0xE9),
    ('ô', 0xED),
    ('ö', 0x7C),
    ('ø', 0xAC),
    ('ù', 0xA6),
    ('ú', 0xEA),
    ('ü', 0x7E),
    ('ý', 0xEB),
    ('Č', 0xF0),
    ('č', 0xF5),
    ('Ě', 0xF1),
    ('ě', 0xF6),
    ('ğ', 0xC9),
    ('İ', 0xCC),
    ('ı', 0xCD),
    ('Ř', 0xF2),
    ('ř', 0xF7),
    ('Ş', 0xCA),
    ('ş', 0xCB),
    ('Š', 0xF3),
    ('š', 0xF8),
    ('Ž', 0xF4),
    ('ž', 0xF9),
    ('ƒ', 0xD5),
    ('Ʃ', 0xB8),
    ('ǃ', 0x21),
    ('ǧ', 0xC9),
    ('ș', 0xCB),
    ('ȼ', 0xB1),
    ('ɑ', 0x9C),
    ('ɛ', 0x9D),
    ('ʳ', 0xAD),
    ('ʹ', 0x27),
    ('ʺ', 0x22),
    ('ʼ', 0x27),
    ('˂', 0x3C),
    ('˃', 0x3E),
    ('˄', 0x1D),
    ('ˆ', 0x1D),
    ('ˈ', 0x27),
    ('ˍ', 0xC4),
    ('˖', 0x2B),
    ('˗', 0x2D),
    ('˚', 0x80),
    ('˜', 0xCE),
    ('˝', 0x22),
    ('\u{37E}', 0x3B), // greek question mark
    ('Γ', 0xC0),
    ('Δ', 0xB0),
    ('Θ', 0xB9),
    ('Λ', 0xC1),
    ('Ξ', 0xBA),
    ('Π', 0xC2),
    ('Σ', 0xB8),
    ('Υ', 0xC3),
    ('Φ', 0xB2),
    ('Ψ', 0xB7),
    ('Ω', 0xB5),
    ('α', 0x9C),
    ('β', 0xBE),
    ('δ', 0x9E),
    ('ε', 0x9D),
    ('θ', 0xB9),
    ('λ', 0xB4),
    ('μ', 0x8F),
    ('π', 0xB6),
    ('τ', 0xB3),
    ('ϓ', 0xC3),
    ('ϴ', 0xB9),
    ('ӕ', 0xBD),
    ('։', 0x3A),
    ('׃', 0x3A),
    ('׳', 0x27),
    ('״', 0x22),
    ('٪', 0x25),
    ('٭', 0x2A),
    ('፡', 0x3A),
    ('᐀', 0x3D),
    ('ᴼ', 0x80),
    ('ᵒ', 0x80),
    ('ᵖ', 0xAA),
    ('ᵛ', 0x1E),
    ('\u{2000}', 0x20), // en quad
    ('\u{2001}', 0x20), // em quad
    ('\u{2002}', 0x20), // en space
    ('\u{2003}', 0x20), // em space
    ('\u{2004}', 0x20), // three-per-em space
    ('\u{2005}', 0x20), // four-per-em space
    ('\u{2006}', 0x20), // six-per-em space
    ('\u{2007}', 0x20), // figure space
    ('\u{2008}', 0x20), // punctuation space
    ('\u{2009}', 0x20), // thin space
    ('\u{200A}', 0x20), // hair space
    ('‐', 0x2D),
    ('‑', 0x2D),
    ('‒', 0x2D),
    ('–', 0x2D),
    ('‘', 0x27),
    ('’', 0x27),
    ('‚', 0x2C),
    ('“', 0x98),
    ('”', 0x99),
    ('•', 0xDD),
    ('․', 0x2E),
    ('\u{202F}', 0x20), // narrow no-break space
    ('′', 0x27),
    ('″', 0x22),
    ('‹', 0x3C),
    ('›', 0x3E),
    ('⁄', 0x2F),
    ('⁒', 0x25),
    ('⁓', 0xCE),
    ('\u{2060}', 0x20), // word joiner
    ('⁰', 0x80),
    ('⁴', 0x84),
    ('⁵', 0x85),
    ('⁶', 0x86),
    ('⁷', 0x87),
    ('⁸', 0x88),
    ('⁹', 0x89),
    ('₧', 0xDB),
    ('₵', 0xB1),
    ('℔', 0x23),
    ('\u{2126}', 0xB5), // ohm sign
    ('\u{212B}', 0xAE), // angstrom sign
    ('←', 0xE1),
    ('↑', 0xDE),
    ('→', 0xDF),
    ('↓', 0xE0),
    ('↖', 0x16),
    ('↗', 0x17),
    ('↘', 0x19),
    ('↙', 0x18),
    ('↲', 0x1C),
    ('↵', 0x1C),
    ('∆', 0xB0),
    ('∏', 0xC2),
    ('∑', 0xB8),
    ('−', 0x2D),
    ('∕', 0x2F),
    ('∗', 0x2A),
    ('∞', 0x9F),
    ('∶', 0x3A),
    ('∼', 0xCE),
    ('≤', 0x8E),
    ('≥', 0x8D),
    ('≪', 0x14),
    ('≫', 0x15),
    ('⋅', 0xDD),
    ('⌂', 0xB0),
    ('⌃', 0x1D),
    ('⌗', 0x23),
    ('\u{2329}', 0x3C), // left-pointing angle bracket
    ('\u{232A}', 0x3E), // right-pointing angle bracket
    ('⏎', 0x1C),
    ('⏫', 0x12),
    ('⏬', 0x13),
    ('⏴', 0x11),
    ('⏵', 0x10),
    ('⏶', 0x1A),
    ('⏷', 0x1B),
    ('⏺', 0xBB),
    ('█', 0xD6),
    ('▉', 0xD7),
    ('▊', 0xD7),
    ('▋', 0xD8),
    ('▌', 0xD8),
    ('▍', 0xD9),
    ('▎', 0xDA),
    ('▏', 0xDA),
    ('▲', 0x1A),
    ('▴', 0x1A),
    ('▶', 0x10),
    ('▸', 0x10),
    ('►', 0x10),
    ('▼', 0x1B),
    ('▾', 0x1B),
    ('◀', 0x11),
    ('◆', 0x94),
    ('◇', 0xCF),
    ('◊', 0xCF),
    ('◦', 0xDC),
    ('♢', 0xCF),
    ('♥', 0x93),
    ('♦', 0x94),
    ('♪', 0x90),
    ('♬', 0x91),
    ('♯', 0x23),
    ('⚫', 0xBB),
    ('⚹', 0x2A),
    ('❝', 0x98),
    ('❞', 0x99),
    ('❤', 0x93),
    ('⟋', 0x2F),
    ('⟨', 0x3C),
    ('⟩', 0x3E),
    ('⧣', 0x23),
    ('⬅', 0xE1),
    ('⬆', 0xDE),
    ('⬇', 0xE0),
    ('⬈', 0x17),
    ('⬉', 0x16),
    ('⬊', 0x19),
    ('⬋', 0x18),
    ('⬤', 0xBB),
    ('⭠', 0xE1),
    ('⭡', 0xDE),
    ('⭢', 0xDF),
    ('⭣', 0xE0),
    ('⭦', 0x16),
    ('⭧', 0x17),
    ('⭨', 0x19),
    ('⭩', 0x18),
    ('⮐', 0x1C),
    ('⮕', 0xDF),
    ('⯇', 0x11),
    ('⯈', 0x10),
    ('⹀', 0x3D),
    ('\u{3000}', 0x20), // ideographic space
    ('〃', 0x22),
    ('〈', 0x3C),
    ('〉', 0x3E),
    ('《', 0x14),
    ('》', 0x15),
    ('「', 0x96),
    ('」', 0x97),
    ('〜', 0xCE),
    ('゠', 0x3D),
    ('꞉', 0x3A),
    ('꞊', 0x3D),
    ('ꞌ', 0x27),
    ('～', 0xCE),
    ('𐆐', 0x3D),
    ('𐆑', 0x2D),
    ('𐎂', 0x95),
    ('\u{1D160}', 0x90), // musical symbol eighth note
    ('💙', 0x93),
    ('💚', 0x93),
    ('💛', 0x93),
    ('💜', 0x93),
    ('🔔', 0x92),
    ('🔴', 0xBB),
    ('🕭', 0x92),
    ('🖤', 0x93),
    ('🟰', 0x3D),
    ('🤎', 0x93),
    ('🧡', 0x93),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sorted_and_unique() {
        assert!(CHARSET.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_table_avoids_sprite_band_and_identity() {
        for &(c, b) in CHARSET {
            assert!(b >= 0x10, "{c:?} maps into the sprite band");
            assert!(!is_identity(c), "{c:?} shadows the identity range");
        }
    }

    #[test]
    fn test_identity_range() {
        assert_eq!(transliterate("A"), vec![0x41]);
        assert_eq!(transliterate("Hello, world?"), b"Hello, world?".to_vec());
        assert_eq!(transliterate("0123456789"), b"0123456789".to_vec());
    }

    #[test]
    fn test_ascii_outside_identity() {
        assert_eq!(
            transliterate("$@[\\]{|}~_^"),
            vec![0xA2, 0xA0, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF, 0xCE, 0xC4, 0x1D]
        );
        assert_eq!(encode_char('`'), REPLACEMENT);
    }

    #[test]
    fn test_many_to_one() {
        assert_eq!(encode_char('ß'), 0xBE);
        assert_eq!(encode_char('β'), 0xBE);
        assert_eq!(encode_char('Å'), encode_char('\u{212B}'));
        assert_eq!(encode_char('µ'), encode_char('μ'));
    }

    #[test]
    fn test_symbols() {
        assert_eq!(encode_char('▶'), 0x10);
        assert_eq!(encode_char('→'), 0xDF);
        assert_eq!(encode_char('♪'), 0x90);
        assert_eq!(encode_char('°'), 0x80);
        assert_eq!(encode_char('\u{3000}'), 0x20);
    }

    #[test]
    fn test_unmapped_becomes_replacement() {
        assert_eq!(encode_char('😀'), REPLACEMENT);
        assert_eq!(encode_char('\n'), REPLACEMENT);
        assert_eq!(encode_char('\0'), REPLACEMENT);
        assert_eq!(encode_char('¿'), REPLACEMENT);
    }

    #[test]
    fn test_one_byte_per_char() {
        let text = "Größe: 5µm → ♬";
        assert_eq!(transliterate(text).len(), text.chars().count());
    }

    #[test]
    fn test_encode_utf8_split_sequence() {
        let bytes = "aß".as_bytes();
        let mut out = Vec::new();
        let (n, status) = encode_utf8(&bytes[..2], &mut out, false);
        assert_eq!((n, status), (1, EncodeStatus::NeedMoreInput));
        assert_eq!(out, vec![b'a']);

        let (n, status) = encode_utf8(&bytes[1..], &mut out, false);
        assert_eq!((n, status), (2, EncodeStatus::Complete));
        assert_eq!(out, vec![b'a', 0xBE]);
    }

    #[test]
    fn test_encode_utf8_truncated_at_eof() {
        let mut out = Vec::new();
        let (n, status) = encode_utf8(&[b'x', 0xE2, 0x86], &mut out, true);
        assert_eq!((n, status), (3, EncodeStatus::Complete));
        assert_eq!(out, vec![b'x', REPLACEMENT]);
    }

    #[test]
    fn test_encode_utf8_invalid_bytes() {
        let mut out = Vec::new();
        let (n, status) = encode_utf8(&[b'a', 0xFF, b'b'], &mut out, false);
        assert_eq!((n, status), (3, EncodeStatus::Complete));
        assert_eq!(out, vec![b'a', REPLACEMENT, b'b']);
    }

    #[test]
    fn test_encoder_chunked_feeding() {
        let text = "→ß♪";
        let mut encoder = Encoder::new();
        let mut out = Vec::new();
        for byte in text.as_bytes() {
            encoder.feed(std::slice::from_ref(byte), &mut out);
        }
        assert_eq!(encoder.pending_len(), 0);
        assert_eq!(out, transliterate(text));
    }

    #[test]
    fn test_encoder_finish_flushes_partial() {
        let mut encoder = Encoder::new();
        let mut out = Vec::new();
        assert_eq!(encoder.feed(&[0xC3], &mut out), EncodeStatus::NeedMoreInput);
        assert!(out.is_empty());
        encoder.finish(&mut out);
        assert_eq!(out, vec![REPLACEMENT]);
        assert_eq!(encoder.pending_len(), 0);
    }
}
