//! Textual encapsulation of opaque byte payloads.
//!
//! Bodies are kept as plain text whenever they are valid UTF-8 so recorded
//! documents stay readable; everything else is base64. Generic captures may
//! additionally be gzip-compressed before base64 encoding.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use super::DecodeError;
use crate::models::http::BodyType;

/// Encodes raw bytes for persistence, choosing text when the bytes are UTF-8.
#[must_use]
pub fn encode_body(bytes: &[u8]) -> (String, BodyType) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), BodyType::Utf8),
        Err(_) => (STANDARD.encode(bytes), BodyType::Binary),
    }
}

/// Reverses [`encode_body`].
///
/// # Errors
///
/// Returns an error if a binary body is not valid base64.
pub fn decode_body(body: &str, body_type: BodyType) -> Result<Vec<u8>, DecodeError> {
    match body_type {
        BodyType::Utf8 => Ok(body.as_bytes().to_vec()),
        BodyType::Binary => STANDARD.decode(body).map_err(|e| DecodeError::invalid("body", e)),
    }
}

/// Gzip-compresses `bytes` and base64-encodes the result.
///
/// # Errors
///
/// Returns an error if the gzip stream cannot be written.
pub fn compress_payload(bytes: &[u8]) -> std::io::Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

/// Base64-decodes and gunzips a payload produced by [`compress_payload`].
///
/// An empty input is an empty payload; no gzip reader is constructed for it.
///
/// # Errors
///
/// Returns an error if the input is not base64 or not a gzip stream.
pub fn decompress_payload(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let compressed =
        STANDARD.decode(encoded).map_err(|e| DecodeError::invalid("compressed payload", e))?;
    if compressed.is_empty() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::invalid("gzip stream", e))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn utf8_body_stays_text() {
        let (body, kind) = encode_body("{\"ok\":true}".as_bytes());
        assert_eq!(body, "{\"ok\":true}");
        assert_eq!(kind, BodyType::Utf8);
    }

    #[test]
    fn invalid_utf8_becomes_base64() {
        let (body, kind) = encode_body(&[0xff, 0xfe, 0x00]);
        assert_eq!(kind, BodyType::Binary);
        assert_eq!(body, "//4A");
    }

    #[test]
    fn empty_compressed_payload_is_empty() {
        assert_eq!(decompress_payload("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn compressed_payload_is_not_plain_base64() {
        let encoded = compress_payload(b"hello hello hello hello").unwrap();
        assert_ne!(encoded, STANDARD.encode(b"hello hello hello hello"));
        assert_eq!(decompress_payload(&encoded).unwrap(), b"hello hello hello hello");
    }

    #[test]
    fn garbage_gzip_is_an_error() {
        let encoded = STANDARD.encode(b"not gzip");
        assert!(decompress_payload(&encoded).is_err());
    }

    proptest! {
        #[test]
        fn body_heuristic_is_reversible(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let (body, kind) = encode_body(&bytes);
            prop_assert_eq!(decode_body(&body, kind).unwrap(), bytes);
        }

        #[test]
        fn text_body_is_reversible(text in ".*") {
            let (body, kind) = encode_body(text.as_bytes());
            prop_assert_eq!(kind, BodyType::Utf8);
            prop_assert_eq!(decode_body(&body, kind).unwrap(), text.into_bytes());
        }

        #[test]
        fn compression_is_reversible(bytes in proptest::collection::vec(any::<u8>(), 1..512)) {
            let encoded = compress_payload(&bytes).unwrap();
            prop_assert_eq!(decompress_payload(&encoded).unwrap(), bytes);
        }
    }
}
