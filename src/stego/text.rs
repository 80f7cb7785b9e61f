//! Invisible-text codec.
//!
//! Bytes become a run of zero-width characters: U+200B for bit 0, U+200C for
//! bit 1, most-significant bit first. U+200D separates the visible cover text
//! from an injected payload.

use rand::Rng;
use thiserror::Error;

use crate::config::{ZW_DELIMITER, ZW_ONE, ZW_ZERO};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TextCodecError {
    #[error("invisible bit count {0} is not a multiple of 8")]
    InvalidBitLength(usize),
}

fn is_data_char(c: char) -> bool {
    c == ZW_ZERO || c == ZW_ONE
}

fn is_reserved_char(c: char) -> bool {
    is_data_char(c) || c == ZW_DELIMITER
}

fn random_data_char<R: Rng>(rng: &mut R) -> char {
    if rng.gen::<bool>() {
        ZW_ONE
    } else {
        ZW_ZERO
    }
}

pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 8 * ZW_ZERO.len_utf8());
    for &byte in data {
        for shift in (0..8).rev() {
            out.push(if (byte >> shift) & 1 == 1 { ZW_ONE } else { ZW_ZERO });
        }
    }
    out
}

/// Decode the data characters in `text`, ignoring everything else.
pub fn decode(text: &str) -> Result<Vec<u8>, TextCodecError> {
    let bits: Vec<u8> = text
        .chars()
        .filter(|&c| is_data_char(c))
        .map(|c| u8::from(c == ZW_ONE))
        .collect();

    if bits.len() % 8 != 0 {
        return Err(TextCodecError::InvalidBitLength(bits.len()));
    }

    Ok(bits
        .chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | bit))
        .collect())
}

/// `cover ‖ delimiter ‖ payload`.
pub fn inject(cover: &str, encoded_payload: &str) -> String {
    let mut out = String::with_capacity(cover.len() + ZW_DELIMITER.len_utf8() + encoded_payload.len());
    out.push_str(cover);
    out.push(ZW_DELIMITER);
    out.push_str(encoded_payload);
    out
}

/// Locate an encoded payload inside `message`.
///
/// Everything after the last delimiter wins when it holds at least one byte
/// of data characters. Otherwise all data characters in the message are taken,
/// but only when their count is a non-zero multiple of 8.
pub fn extract(message: &str) -> Option<String> {
    // The cover may hold its own U+200D (emoji ZWJ sequences); ours is always last.
    if let Some(pos) = message.rfind(ZW_DELIMITER) {
        let after = &message[pos + ZW_DELIMITER.len_utf8()..];
        let payload: String = after.chars().filter(|&c| is_data_char(c)).collect();
        if payload.chars().count() >= 8 {
            return Some(payload);
        }
    }

    let all: String = message.chars().filter(|&c| is_data_char(c)).collect();
    let count = all.chars().count();
    if count >= 8 && count % 8 == 0 {
        Some(all)
    } else {
        None
    }
}

/// Fast pre-filter: does `message` carry any data characters at all?
pub fn contains_payload(message: &str) -> bool {
    message.chars().any(is_data_char)
}

/// Sprinkle decoy data characters over `message`.
///
/// After each visible character, with probability 1/2, insert 1..=`intensity`
/// random data characters. Finish with 1..=7 more so the total is unlikely to
/// land on a byte boundary. Stripping the result gives back `message`.
pub fn chaff(message: &str, intensity: usize) -> String {
    chaff_with_rng(message, intensity, &mut rand::thread_rng())
}

pub fn chaff_with_rng<R: Rng>(message: &str, intensity: usize, rng: &mut R) -> String {
    let intensity = intensity.max(1);
    let mut out = String::with_capacity(message.len() * (1 + intensity * ZW_ZERO.len_utf8()));

    for c in message.chars() {
        out.push(c);
        if rng.gen::<bool>() {
            for _ in 0..rng.gen_range(1..=intensity) {
                out.push(random_data_char(rng));
            }
        }
    }

    for _ in 0..rng.gen_range(1..=7) {
        out.push(random_data_char(rng));
    }
    out
}

/// Remove every reserved zero-width character.
pub fn strip(message: &str) -> String {
    message.chars().filter(|&c| !is_reserved_char(c)).collect()
}

/// Character counts for a message (counts are Unicode scalar values).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub total_length: usize,
    pub visible_chars: usize,
    pub invisible_chars: usize,
    pub estimated_bytes: usize,
    pub has_valid_payload: bool,
}

pub fn stats(message: &str) -> Stats {
    let mut total_length = 0;
    let mut visible_chars = 0;
    let mut invisible_chars = 0;
    for c in message.chars() {
        total_length += 1;
        if is_data_char(c) {
            invisible_chars += 1;
        }
        if !is_reserved_char(c) {
            visible_chars += 1;
        }
    }

    Stats {
        total_length,
        visible_chars,
        invisible_chars,
        estimated_bytes: invisible_chars / 8,
        has_valid_payload: invisible_chars >= 8 && invisible_chars % 8 == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let samples: [&[u8]; 4] = [b"", b"Hello, Ghost Whisper!", &[0x00, 0xFF, 0x80, 0x01], "Noted 👍".as_bytes()];
        for data in samples {
            assert_eq!(decode(&encode(data)).unwrap(), data);
        }
        let all: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&all)).unwrap(), all);
    }

    #[test]
    fn test_encoded_shape() {
        let encoded = encode(b"Test");
        assert_eq!(encoded.chars().count(), 32);
        assert!(encoded.chars().all(is_data_char));
        assert_eq!(encode(&[0b1000_0000]).chars().next(), Some(ZW_ONE));
    }

    #[test]
    fn test_decode_ignores_other_chars() {
        let mut noisy = String::new();
        for (i, c) in encode(b"ok").chars().enumerate() {
            noisy.push(c);
            if i % 3 == 0 {
                noisy.push('x');
                noisy.push(ZW_DELIMITER);
            }
        }
        assert_eq!(decode(&noisy).unwrap(), b"ok");
    }

    #[test]
    fn test_decode_invalid_bit_length() {
        let mut encoded = encode(b"a");
        encoded.push(ZW_ONE);
        assert_eq!(decode(&encoded), Err(TextCodecError::InvalidBitLength(9)));
    }

    #[test]
    fn test_inject_extract() {
        let encoded = encode(b"Secret message");
        let combined = inject("Noted 👍", &encoded);
        assert!(combined.starts_with("Noted 👍"));
        let extracted = extract(&combined).unwrap();
        assert_eq!(decode(&extracted).unwrap(), b"Secret message");
        assert_eq!(strip(&combined), "Noted 👍");
    }

    #[test]
    fn test_extract_after_chaffed_cover() {
        let cover = chaff("Hello there, friend", 3);
        let combined = inject(&cover, &encode(b"payload"));
        let extracted = extract(&combined).unwrap();
        assert_eq!(decode(&extracted).unwrap(), b"payload");
        assert_eq!(strip(&combined), "Hello there, friend");
    }

    #[test]
    fn test_extract_after_zwj_emoji_cover() {
        // The family emoji joins its parts with U+200D.
        let cover = chaff("Love you 👨\u{200D}👩\u{200D}👧", 3);
        let combined = inject(&cover, &encode(b"payload"));
        let extracted = extract(&combined).unwrap();
        assert_eq!(decode(&extracted).unwrap(), b"payload");
    }

    #[test]
    fn test_extract_fallback_without_delimiter() {
        let message = format!("hi{}there", encode(b"ab"));
        assert_eq!(decode(&extract(&message).unwrap()).unwrap(), b"ab");

        let odd = format!("hi{}", &encode(b"ab")[..ZW_ZERO.len_utf8() * 15]);
        assert_eq!(extract(&odd), None);
    }

    #[test]
    fn test_extract_none_for_plain_text() {
        assert_eq!(extract("Hello, world!"), None);
        assert_eq!(extract(""), None);
        // delimiter with too few bits and no aligned fallback
        let short = format!("x{}{}", ZW_DELIMITER, "\u{200B}\u{200C}\u{200B}");
        assert_eq!(extract(&short), None);
    }

    #[test]
    fn test_contains_payload() {
        assert!(contains_payload(&inject("Hello", &encode(b"test"))));
        assert!(!contains_payload("Hello, world!"));
        assert!(!contains_payload(""));
        assert!(!contains_payload(&ZW_DELIMITER.to_string()));
    }

    #[test]
    fn test_chaff_preserves_visible_text() {
        for message in ["Hello, world!", "", "Noted 👍", "a"] {
            let chaffed = chaff(message, 2);
            assert_eq!(strip(&chaffed), message);
            assert!(contains_payload(&chaffed));
            let s = stats(&chaffed);
            assert_eq!(s.visible_chars, message.chars().count());
            assert!(s.invisible_chars >= 1);
        }
    }

    #[test]
    fn test_chaff_respects_intensity() {
        let message = "abcdefghijklmnopqrstuvwxyz";
        for _ in 0..20 {
            let chaffed = chaff(message, 1);
            // at most one decoy per visible char plus the 1..=7 tail
            assert!(stats(&chaffed).invisible_chars <= message.len() + 7);
        }
        // zero intensity is treated as one
        assert_eq!(strip(&chaff(message, 0)), message);
    }

    #[test]
    fn test_stats() {
        let combined = inject("Hi 👍", &encode(b"xy"));
        let s = stats(&combined);
        assert_eq!(
            s,
            Stats {
                total_length: 4 + 1 + 16,
                visible_chars: 4,
                invisible_chars: 16,
                estimated_bytes: 2,
                has_valid_payload: true,
            }
        );
        assert!(!stats("plain").has_valid_payload);
    }
}
