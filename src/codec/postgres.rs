//! Postgres message framing.
//!
//! Messages are split but not interpreted: typed messages are an
//! identifier byte followed by a 4-byte big-endian length that counts
//! itself; startup-phase messages omit the identifier.

use super::reader::Reader;
use super::DecodeError;
use crate::models::generic::Origin;
use crate::models::postgres::{message_name, PostgresPacket};
use crate::models::Blob;

const LENGTH_LEN: u32 = 4;

const SSL_REQUEST_CODE: u32 = 80_877_103;
const GSSENC_REQUEST_CODE: u32 = 80_877_104;
const CANCEL_REQUEST_CODE: u32 = 80_877_102;

fn startup_name(code: Option<u32>) -> &'static str {
    match code {
        Some(SSL_REQUEST_CODE) => "SSLRequest",
        Some(GSSENC_REQUEST_CODE) => "GSSENCRequest",
        Some(CANCEL_REQUEST_CODE) => "CancelRequest",
        _ => "StartupMessage",
    }
}

/// Splits a captured byte stream from one side of a connection.
///
/// # Errors
///
/// Returns an error if a length field is truncated, smaller than itself,
/// or points past the end of the stream.
pub fn decode_stream(bytes: &[u8], origin: Origin) -> Result<Vec<PostgresPacket>, DecodeError> {
    if origin == Origin::Server && bytes.len() == 1 && matches!(bytes[0], b'S' | b'N') {
        return Ok(vec![PostgresPacket {
            identifier: Some(char::from(bytes[0])),
            message_type: "SSLResponse".into(),
            length: None,
            payload: Blob::default(),
        }]);
    }

    let mut r = Reader::new(bytes);
    let mut packets = Vec::new();
    while let Some(first) = r.peek() {
        let identifier = if origin == Origin::Client && first == 0 {
            None
        } else {
            r.u8("message identifier")?;
            Some(first)
        };
        let length = r.u32_be("message length")?;
        let body_len = length
            .checked_sub(LENGTH_LEN)
            .ok_or_else(|| DecodeError::invalid("message length", length))?;
        let payload = r.take(body_len as usize, "message body")?;
        let message_type = match identifier {
            Some(id) => message_name(origin, id),
            None => startup_name(Reader::new(payload).u32_be("startup code").ok()),
        };
        packets.push(PostgresPacket {
            identifier: identifier.map(char::from),
            message_type: message_type.into(),
            length: Some(length),
            payload: payload.into(),
        });
    }
    Ok(packets)
}

/// Writes packets back as one contiguous stream, recomputing lengths.
#[must_use]
pub fn encode(packets: &[PostgresPacket]) -> Vec<u8> {
    let mut out = Vec::new();
    for packet in packets {
        if let Some(id) = packet.identifier {
            out.push(u8::try_from(id).unwrap_or(b'?'));
        }
        if packet.length.is_some() {
            let body = packet.payload.as_bytes();
            let length = u32::try_from(body.len()).unwrap_or(u32::MAX - LENGTH_LEN) + LENGTH_LEN;
            out.extend_from_slice(&length.to_be_bytes());
            out.extend_from_slice(body);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(id: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![id];
        out.extend_from_slice(&(u32::try_from(body.len()).unwrap() + 4).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn startup_then_query() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&8u32.to_be_bytes());
        wire.extend_from_slice(&SSL_REQUEST_CODE.to_be_bytes());
        wire.extend_from_slice(&typed(b'Q', b"SELECT 1\0"));

        let packets = decode_stream(&wire, Origin::Client).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].identifier, None);
        assert_eq!(packets[0].message_type, "SSLRequest");
        assert_eq!(packets[1].identifier, Some('Q'));
        assert_eq!(packets[1].message_type, "Query");
        assert_eq!(packets[1].length, Some(13));
        assert_eq!(encode(&packets), wire);
    }

    #[test]
    fn ssl_reply_is_a_bare_byte() {
        let packets = decode_stream(b"N", Origin::Server).unwrap();
        assert_eq!(packets[0].identifier, Some('N'));
        assert_eq!(packets[0].length, None);
        assert_eq!(encode(&packets), b"N");
    }

    #[test]
    fn server_messages_are_named_by_direction() {
        let mut wire = typed(b'C', b"SELECT 1\0");
        wire.extend_from_slice(&typed(b'Z', b"I"));
        let packets = decode_stream(&wire, Origin::Server).unwrap();
        assert_eq!(packets[0].message_type, "CommandComplete");
        assert_eq!(packets[1].message_type, "ReadyForQuery");
    }

    #[test]
    fn length_smaller_than_itself_is_invalid() {
        let err = decode_stream(&[b'Q', 0, 0, 0, 2], Origin::Client).unwrap_err();
        assert!(matches!(err, DecodeError::Invalid { .. }));
    }

    #[test]
    fn truncated_body_is_short() {
        let err = decode_stream(&[b'Q', 0, 0, 0, 9, b'x'], Origin::Client).unwrap_err();
        assert!(matches!(err, DecodeError::Short { .. }));
    }
}
