//! Text encoding detection for byte samples.
//!
//! Order: byte-order mark, then UTF-8 validity, then windows-1252 (which
//! decodes any byte sequence). Decoding never fails: undecodable input
//! becomes U+FFFD.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

pub fn detect_encoding(sample: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(sample) {
        return encoding;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => UTF_8,
        // A multi-byte sequence cut off by the sample boundary is still UTF-8.
        Err(err) if err.error_len().is_none() => UTF_8,
        Err(_) => WINDOWS_1252,
    }
}

/// Decode with the detected encoding. Returns the text and the encoding name.
pub fn decode_lossy(sample: &[u8]) -> (String, &'static str) {
    let encoding = detect_encoding(sample);
    let (text, actual, had_errors) = encoding.decode(sample);
    if had_errors {
        tracing::debug!(encoding = actual.name(), "replaced undecodable bytes in sample");
    }
    (text.into_owned(), actual.name())
}
