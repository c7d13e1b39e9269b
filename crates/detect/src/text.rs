//! Plain text heuristic.
//!
//! Content "looks like text" when some character encoding can decode it:
//! either a byte order mark names the encoding, or the encoding guessed from
//! byte statistics decodes the whole buffer cleanly.

use chardetng::EncodingDetector;
use encoding_rs::{DecoderResult, Encoding};

/// Whether `bytes` decode as text in some known encoding. Always `false` for
/// empty content.
#[must_use]
pub fn looks_like_text(bytes: &[u8]) -> bool {
    !bytes.is_empty() && detect_encoding(bytes).is_some()
}

/// The encoding `bytes` are written in, if any.
///
/// `bytes` is usually a truncated head of the content, so a multi-byte
/// sequence cut off at the very end is not held against it.
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return Some(encoding);
    }
    let mut detector = EncodingDetector::new();
    // Not the last buffer: the head may end mid-sequence.
    detector.feed(bytes, false);
    let encoding = detector.guess(None, true);
    let decodes = decodes_cleanly(encoding, bytes);
    tracing::trace!(encoding = encoding.name(), decodes, "Guessed encoding");
    decodes.then_some(encoding)
}

fn decodes_cleanly(encoding: &'static Encoding, bytes: &[u8]) -> bool {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let Some(capacity) = decoder.max_utf8_buffer_length_without_replacement(bytes.len()) else {
        return false;
    };
    let mut text = String::with_capacity(capacity);
    let (result, _) = decoder.decode_to_string_without_replacement(bytes, &mut text, false);
    matches!(result, DecoderResult::InputEmpty) && !text.chars().any(is_binary_control)
}

/// Control characters that do not appear in text files.
fn is_binary_control(c: char) -> bool {
    // Tab, line feed, carriage return, form feed, escape and backspace are
    // all common in logs and terminal captures.
    c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c' | '\x1b' | '\x08')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"a\n")]
    #[case(b"Hello, world!\r\n")]
    #[case(b"tab\tseparated\tvalues\n")]
    #[case(b"\x1b[1mbold\x1b[0m\n")]
    #[case("caf\u{e9} cr\u{e8}me br\u{fb}l\u{e9}e".as_bytes())]
    #[case("\u{65e5}\u{672c}\u{8a9e}\u{306e}\u{6587}\u{7ae0}\u{3067}\u{3059}\u{3002}".as_bytes())]
    #[case(b"caf\xe9 au lait")]
    #[case(b"\xef\xbb\xbfwith a UTF-8 BOM")]
    #[case(b"\xff\xfeU\x00T\x00F\x00-\x001\x006\x00")]
    fn text(#[case] bytes: &[u8]) {
        assert!(looks_like_text(bytes));
    }

    #[rstest]
    #[case(b"")]
    #[case(b"\x00\x01\x02\x03")]
    #[case(b"PK\x03\x04\x14\x00\x00\x00\x08\x00")]
    #[case(b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR")]
    #[case(b"text with a NUL\x00 in the middle")]
    fn binary(#[case] bytes: &[u8]) {
        assert!(!looks_like_text(bytes));
    }

    #[test]
    fn truncated_trailing_sequence_is_tolerated() {
        let text = "na\u{ef}ve r\u{e9}sum\u{e9} \u{2014} \u{2014} \u{2014}".as_bytes();
        // Cut the last em dash after its first byte.
        let cut = &text[..text.len() - 2];
        assert!(looks_like_text(cut));
    }

    #[test]
    fn bom_decides_encoding() {
        assert_eq!(detect_encoding(b"\xfe\xff\x00A"), Some(encoding_rs::UTF_16BE));
        assert_eq!(detect_encoding(b"\xef\xbb\xbf"), Some(encoding_rs::UTF_8));
    }
}
