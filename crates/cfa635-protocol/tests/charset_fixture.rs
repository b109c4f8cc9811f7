//! Checks the transliteration table against the recorded device charset
//! fixture, so display contents stay byte-for-byte compatible.

use cfa635_protocol::{encode_char, is_identity, transliterate, REPLACEMENT};

const FIXTURE: &str = include_str!("fixtures/charset.tsv");

fn entries() -> Vec<(char, u8)> {
    FIXTURE
        .lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .map(|line| {
            let (cp, byte) = line.split_once('\t').expect("tab-separated line");
            let cp = u32::from_str_radix(cp.trim_start_matches("U+"), 16).expect("hex code point");
            let byte = u8::from_str_radix(byte.trim(), 16).expect("hex byte");
            (char::from_u32(cp).expect("valid scalar value"), byte)
        })
        .collect()
}

#[test]
fn test_fixture_entries_match() {
    let entries = entries();
    assert_eq!(entries.len(), 307);
    for (c, expected) in entries {
        assert_eq!(
            encode_char(c),
            expected,
            "U+{:04X} {:?} transliterated incorrectly",
            c as u32,
            c
        );
    }
}

#[test]
fn test_identity_range_maps_to_itself() {
    for b in 0x20u8..0x7F {
        let c = b as char;
        if is_identity(c) {
            assert_eq!(encode_char(c), b);
        }
    }
}

#[test]
fn test_output_never_in_sprite_band() {
    for cp in (0..0x3_0000u32).filter_map(char::from_u32) {
        assert!(encode_char(cp) >= 0x10, "U+{:04X} maps into the sprite band", cp as u32);
    }
}

#[test]
fn test_sharp_s_and_beta_collide() {
    assert_eq!(transliterate("ß"), vec![0xBE]);
    assert_eq!(transliterate("β"), vec![0xBE]);
}

#[test]
fn test_emoji_is_replaced() {
    assert_eq!(transliterate("🎵"), vec![REPLACEMENT]);
    assert_eq!(transliterate("🦀"), vec![REPLACEMENT]);
}
