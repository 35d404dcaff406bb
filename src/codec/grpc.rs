//! gRPC length-prefixed message framing.
//!
//! A gRPC body is a sequence of frames: a 1-byte compression flag, a
//! 4-byte big-endian payload length, then the payload.

use super::reader::Reader;
use super::DecodeError;
use crate::models::grpc::LengthPrefixedMessage;

const PREFIX_LEN: usize = 5;

/// Splits an HTTP/2 DATA stream into gRPC messages.
///
/// # Errors
///
/// Returns an error if a prefix or payload is truncated.
pub fn decode_frames(bytes: &[u8]) -> Result<Vec<LengthPrefixedMessage>, DecodeError> {
    let mut r = Reader::new(bytes);
    let mut messages = Vec::new();
    while !r.is_empty() {
        let compression_flag = r.u8("grpc compression flag")?;
        let length = r.u32_be("grpc message length")?;
        let payload = r.take(length as usize, "grpc message")?;
        messages.push(LengthPrefixedMessage::new(compression_flag, payload)?);
    }
    Ok(messages)
}

/// Writes messages back as a contiguous stream of frames.
///
/// The length prefix is recomputed from the payload, not taken from
/// `message_length`.
///
/// # Errors
///
/// Returns an error if a binary payload is not valid base64.
pub fn encode_frames(messages: &[LengthPrefixedMessage]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    for message in messages {
        let payload = message.payload()?;
        let length = u32::try_from(payload.len())
            .map_err(|_| DecodeError::invalid("grpc message length", "payload exceeds 4 GiB"))?;
        out.reserve(PREFIX_LEN + payload.len());
        out.push(message.compression_flag);
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&payload);
    }
    Ok(out)
}
