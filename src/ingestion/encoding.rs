//! Best-effort text encoding detection and decoding.
//!
//! Detection looks at the first [`SNIFF_LEN`] bytes: a byte-order mark wins, then a NUL-byte
//! frequency check catches BOM-less UTF-16, then UTF-8 validity decides between UTF-8 and
//! `windows-1252`. Decoding is strict with the detected encoding and falls back to UTF-8 with
//! U+FFFD replacement, so it never fails.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// Number of leading bytes inspected by [`detect_encoding`].
pub const SNIFF_LEN: usize = 10_000;

// Share of NUL bytes at one parity that marks the input as UTF-16.
const UTF16_NUL_RATIO: f64 = 0.3;

/// Text decoded from raw input bytes.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    /// Encoding the text was successfully decoded with (UTF-8 after a lossy fallback).
    pub encoding: &'static Encoding,
    /// `true` if the strict decode failed and replacement characters may be present.
    pub lossy: bool,
}

/// Guess the encoding of `prefix` (typically the first [`SNIFF_LEN`] bytes of a file).
pub fn detect_encoding(prefix: &[u8]) -> &'static Encoding {
    let prefix = &prefix[..prefix.len().min(SNIFF_LEN)];

    if let Some((encoding, _)) = Encoding::for_bom(prefix) {
        return encoding;
    }
    if let Some(encoding) = sniff_utf16(prefix) {
        return encoding;
    }
    match std::str::from_utf8(prefix) {
        Ok(_) => UTF_8,
        // The prefix may end in the middle of a multi-byte sequence.
        Err(e) if e.error_len().is_none() => UTF_8,
        Err(_) => WINDOWS_1252,
    }
}

/// Decode `bytes`, detecting the encoding from its prefix.
pub fn decode(bytes: &[u8]) -> DecodedText {
    decode_with(bytes, detect_encoding(bytes))
}

/// Decode `bytes` as `encoding`, removing a matching BOM, with the lossy UTF-8 fallback.
pub fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> DecodedText {
    let body = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
        _ => bytes,
    };

    match encoding.decode_without_bom_handling_and_without_replacement(body) {
        Some(text) => DecodedText {
            text: text.into_owned(),
            encoding,
            lossy: false,
        },
        None => {
            let (text, _, _) = UTF_8.decode(bytes);
            DecodedText {
                text: text.into_owned(),
                encoding: UTF_8,
                lossy: true,
            }
        }
    }
}

fn sniff_utf16(prefix: &[u8]) -> Option<&'static Encoding> {
    if prefix.len() < 4 {
        return None;
    }
    let pairs = prefix.len() / 2;
    let (mut even_nul, mut odd_nul) = (0usize, 0usize);
    for pair in prefix.chunks_exact(2) {
        if pair[0] == 0 {
            even_nul += 1;
        }
        if pair[1] == 0 {
            odd_nul += 1;
        }
    }
    let even = even_nul as f64 / pairs as f64;
    let odd = odd_nul as f64 / pairs as f64;
    if odd >= UTF16_NUL_RATIO && even < UTF16_NUL_RATIO / 3.0 {
        Some(UTF_16LE)
    } else if even >= UTF16_NUL_RATIO && odd < UTF16_NUL_RATIO / 3.0 {
        Some(UTF_16BE)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn plain_ascii_and_utf8_are_utf8() {
        assert_eq!(detect_encoding(b"a,b\n1,2\n"), UTF_8);
        assert_eq!(detect_encoding("name\ncafé\n".as_bytes()), UTF_8);
    }

    #[test]
    fn truncated_multibyte_at_prefix_end_is_still_utf8() {
        let bytes = "é".as_bytes();
        assert_eq!(detect_encoding(&bytes[..1]), UTF_8);
    }

    #[test]
    fn latin1_bytes_detect_as_windows_1252() {
        let bytes = b"name\ncaf\xe9\n";
        assert_eq!(detect_encoding(bytes), WINDOWS_1252);
        let decoded = decode(bytes);
        assert_eq!(decoded.text, "name\ncafé\n");
        assert!(!decoded.lossy);
    }

    #[test]
    fn bom_selects_encoding_and_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"a,b\n");
        let decoded = decode(&bytes);
        assert_eq!(decoded.encoding, UTF_8);
        assert_eq!(decoded.text, "a,b\n");

        let mut le = vec![0xFF, 0xFE];
        le.extend(utf16le("a,b\n"));
        assert_eq!(decode(&le).text, "a,b\n");
    }

    #[test]
    fn bomless_utf16_is_sniffed() {
        let bytes = utf16le("a,b\n1,2\n");
        assert_eq!(detect_encoding(&bytes), UTF_16LE);
        assert_eq!(decode(&bytes).text, "a,b\n1,2\n");
    }

    #[test]
    fn strict_failure_falls_back_to_lossy_utf8() {
        let decoded = decode_with(b"ok\xff\n", UTF_8);
        assert!(decoded.lossy);
        assert_eq!(decoded.text, "ok\u{FFFD}\n");
    }
}
