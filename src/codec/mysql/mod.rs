//! MySQL client/server protocol codec.
//!
//! Packets are framed by a 3-byte little-endian payload length and a 1-byte
//! sequence id. The message inside a frame is not self-describing: the same
//! first byte means different things depending on the connection phase and
//! on the last command the client sent, so decoding threads a
//! [`DecodeContext`] through every call.

mod command;
mod handshake;
mod response;
mod resultset;

use std::borrow::Cow;

use super::reader::{put_u24_le, Reader};
use super::DecodeError;
use crate::models::mysql::{capability, MySqlMessage, MySqlPacket, MySqlPacketHeader, RawPayload};

/// `COM_QUIT`
pub const COM_QUIT: u8 = 0x01;
/// `COM_INIT_DB`
pub const COM_INIT_DB: u8 = 0x02;
/// `COM_QUERY`
pub const COM_QUERY: u8 = 0x03;
/// `COM_PING`
pub const COM_PING: u8 = 0x0e;
/// `COM_CHANGE_USER`
pub const COM_CHANGE_USER: u8 = 0x11;
/// `COM_STMT_PREPARE`
pub const COM_STMT_PREPARE: u8 = 0x16;
/// `COM_STMT_EXECUTE`
pub const COM_STMT_EXECUTE: u8 = 0x17;
/// `COM_STMT_SEND_LONG_DATA`
pub const COM_STMT_SEND_LONG_DATA: u8 = 0x18;
/// `COM_STMT_CLOSE`
pub const COM_STMT_CLOSE: u8 = 0x19;
/// `COM_STMT_RESET`
pub const COM_STMT_RESET: u8 = 0x1a;
/// `COM_STMT_FETCH`
pub const COM_STMT_FETCH: u8 = 0x1c;

/// Largest payload a single frame carries. Longer payloads continue in
/// following frames; a frame of exactly this size is always followed by
/// another, possibly empty.
pub const MAX_FRAME_PAYLOAD: usize = 0x00ff_ffff;

/// Capabilities assumed when decoding mid-connection traffic.
pub const DEFAULT_CAPABILITIES: u32 =
    capability::PROTOCOL_41 | capability::SECURE_CONNECTION | capability::PLUGIN_AUTH;

/// The 4-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireHeader {
    /// Payload length (24 bits).
    pub packet_length: u32,
    /// Sequence id.
    pub packet_number: u8,
}

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the server greeting.
    Greeting,
    /// Waiting for the client's handshake response.
    HandshakeResponse,
    /// Waiting for the server's verdict (OK, ERR, switch, more data).
    AuthResult,
    /// Waiting for the client's reply to an auth switch.
    AuthSwitchResponse,
    /// Authenticated; exchanging commands.
    Command,
}

/// Connection state needed to interpret the next packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeContext {
    /// Current phase.
    pub phase: Phase,
    /// Capabilities advertised by the server greeting.
    pub server_capabilities: u32,
    /// Capabilities sent in the client's handshake response.
    pub client_capabilities: u32,
    /// First byte of the last client command.
    pub last_command: Option<u8>,
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self {
            phase: Phase::Command,
            server_capabilities: DEFAULT_CAPABILITIES,
            client_capabilities: DEFAULT_CAPABILITIES,
            last_command: None,
        }
    }
}

impl DecodeContext {
    /// A context for a connection observed from its first byte.
    #[must_use]
    pub fn handshake() -> Self {
        Self {
            phase: Phase::Greeting,
            server_capabilities: 0,
            client_capabilities: 0,
            last_command: None,
        }
    }

    /// `true` when both sides negotiated `CLIENT_DEPRECATE_EOF`.
    #[must_use]
    pub fn deprecate_eof(&self) -> bool {
        self.server_capabilities & self.client_capabilities & capability::DEPRECATE_EOF != 0
    }

    fn client_has(&self, flag: u32) -> bool {
        self.client_capabilities & flag != 0
    }
}

/// Reads a frame header and returns it with the bytes that follow it.
///
/// # Errors
///
/// Returns an error if fewer than four bytes are available.
pub fn decode_header(buf: &[u8]) -> Result<(WireHeader, &[u8]), DecodeError> {
    let mut r = Reader::new(buf);
    let header = read_header(&mut r)?;
    Ok((header, r.rest()))
}

/// Encodes a frame header.
#[must_use]
pub fn encode_header(header: WireHeader) -> [u8; 4] {
    let len = header.packet_length.to_le_bytes();
    [len[0], len[1], len[2], header.packet_number]
}

fn read_header(r: &mut Reader<'_>) -> Result<WireHeader, DecodeError> {
    let packet_length = r.u24_le("packet header")?;
    let packet_number = r.u8("packet header")?;
    Ok(WireHeader { packet_length, packet_number })
}

/// Reads one logical payload, joining continuation frames. The header is
/// the first frame's.
fn read_frame<'a>(r: &mut Reader<'a>) -> Result<(WireHeader, Cow<'a, [u8]>), DecodeError> {
    let header = read_header(r)?;
    let first = r.take(header.packet_length as usize, "packet payload")?;
    if first.len() < MAX_FRAME_PAYLOAD {
        return Ok((header, Cow::Borrowed(first)));
    }
    let mut payload = first.to_vec();
    loop {
        let next = read_header(r)?;
        let chunk = r.take(next.packet_length as usize, "continuation payload")?;
        payload.extend_from_slice(chunk);
        if chunk.len() < MAX_FRAME_PAYLOAD {
            return Ok((header, Cow::Owned(payload)));
        }
    }
}

/// Appends `payload` as one frame, or as a run of frames with consecutive
/// sequence ids when it does not fit in one.
fn push_frame(out: &mut Vec<u8>, packet_number: u8, payload: &[u8]) {
    let mut seq = packet_number;
    let mut rest = payload;
    loop {
        let (chunk, tail) = rest.split_at(rest.len().min(MAX_FRAME_PAYLOAD));
        put_u24_le(out, u32::try_from(chunk.len()).unwrap_or(u32::MAX));
        out.push(seq);
        out.extend_from_slice(chunk);
        if chunk.len() < MAX_FRAME_PAYLOAD {
            return;
        }
        rest = tail;
        seq = seq.wrapping_add(1);
    }
}

fn packet(header: WireHeader, message: MySqlMessage) -> MySqlPacket {
    MySqlPacket {
        header: MySqlPacketHeader {
            packet_length: header.packet_length,
            packet_number: header.packet_number,
            packet_type: message.packet_type().to_string(),
        },
        message,
    }
}

fn raw(payload: &[u8]) -> MySqlMessage {
    MySqlMessage::Raw(RawPayload { payload: payload.into() })
}

/// Decodes one client packet from the start of `buf`.
///
/// Returns the packet and the number of bytes consumed, and advances `ctx`.
///
/// # Errors
///
/// Returns an error if the frame is truncated or its payload is malformed.
pub fn decode_request(
    buf: &[u8],
    ctx: &mut DecodeContext,
) -> Result<(MySqlPacket, usize), DecodeError> {
    let mut r = Reader::new(buf);
    let (header, frame) = read_frame(&mut r)?;
    let payload: &[u8] = &frame;
    let message = match ctx.phase {
        Phase::HandshakeResponse if is_ssl_request(payload) => raw(payload),
        Phase::HandshakeResponse => {
            let response = handshake::decode_response41(payload)?;
            ctx.client_capabilities = response.capability_flags;
            ctx.phase = Phase::AuthResult;
            MySqlMessage::HandshakeResponse(response)
        }
        Phase::AuthResult | Phase::AuthSwitchResponse => {
            ctx.phase = Phase::AuthResult;
            MySqlMessage::AuthSwitchResponse(response::decode_auth_data(payload, false)?)
        }
        Phase::Greeting => raw(payload),
        Phase::Command => command::decode(payload, ctx)?,
    };
    Ok((packet(header, message), r.position()))
}

fn is_ssl_request(payload: &[u8]) -> bool {
    payload.len() == 32
        && payload[..4].try_into().map(u32::from_le_bytes).is_ok_and(|caps| caps & capability::SSL != 0)
}

/// Decodes one logical server response from the start of `buf`.
///
/// Result sets and prepare responses span several frames; all of them are
/// consumed. Returns the packet and the number of bytes consumed, and
/// advances `ctx`.
///
/// # Errors
///
/// Returns an error if any frame is truncated or malformed.
pub fn decode_response(
    buf: &[u8],
    ctx: &mut DecodeContext,
) -> Result<(MySqlPacket, usize), DecodeError> {
    let mut r = Reader::new(buf);
    let (header, frame) = read_frame(&mut r)?;
    let payload: &[u8] = &frame;
    let first = payload.first().copied();
    let message = match ctx.phase {
        Phase::Greeting => match first {
            Some(handshake::PROTOCOL_VERSION) => {
                let greeting = handshake::decode_v10(payload)?;
                ctx.server_capabilities = greeting.capability_flags;
                ctx.phase = Phase::HandshakeResponse;
                MySqlMessage::HandshakeV10(greeting)
            }
            Some(response::ERR) => response::decode_err(payload)?,
            _ => raw(payload),
        },
        Phase::HandshakeResponse | Phase::AuthResult | Phase::AuthSwitchResponse => match first {
            Some(response::OK) => {
                ctx.phase = Phase::Command;
                MySqlMessage::HandshakeResponseOk(response::decode_ok(payload)?)
            }
            Some(response::ERR) => response::decode_err(payload)?,
            Some(response::AUTH_SWITCH) => {
                ctx.phase = Phase::AuthSwitchResponse;
                MySqlMessage::AuthSwitchRequest(response::decode_auth_switch(payload)?)
            }
            Some(response::AUTH_MORE_DATA) => {
                MySqlMessage::AuthMoreData(response::decode_auth_data(payload, true)?)
            }
            _ => raw(payload),
        },
        Phase::Command => response::decode_command_response(payload, &mut r, ctx)?,
    };
    Ok((packet(header, message), r.position()))
}

/// Encodes a packet back to its exact wire bytes, including every frame of
/// multi-frame responses. Lengths are recomputed from the content.
#[must_use]
pub fn encode_message(packet: &MySqlPacket) -> Vec<u8> {
    let mut out = Vec::new();
    let seq = packet.header.packet_number;
    match &packet.message {
        MySqlMessage::ResultSet(rs) => resultset::encode_result_set(rs, seq, &mut out),
        MySqlMessage::StmtPrepareOk(ok) => resultset::encode_prepare_ok(ok, seq, &mut out),
        message => push_frame(&mut out, seq, &encode_payload(message)),
    }
    out
}

fn encode_payload(message: &MySqlMessage) -> Vec<u8> {
    match message {
        MySqlMessage::HandshakeV10(m) => handshake::encode_v10(m),
        MySqlMessage::HandshakeResponse(m) => handshake::encode_response41(m),
        MySqlMessage::HandshakeResponseOk(m) | MySqlMessage::Ok(m) => response::encode_ok(m),
        MySqlMessage::Err(m) => response::encode_err(m),
        MySqlMessage::Eof(m) => response::encode_eof(m),
        MySqlMessage::AuthSwitchRequest(m) => response::encode_auth_switch(m),
        MySqlMessage::AuthSwitchResponse(m) => m.data.as_bytes().to_vec(),
        MySqlMessage::AuthMoreData(m) => {
            let mut out = vec![response::AUTH_MORE_DATA];
            out.extend_from_slice(m.data.as_bytes());
            out
        }
        MySqlMessage::Raw(m) => m.payload.as_bytes().to_vec(),
        MySqlMessage::ResultSet(_) | MySqlMessage::StmtPrepareOk(_) => Vec::new(),
        command => command::encode(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mysql::ComQuery;

    #[test]
    fn header_is_little_endian_length_then_sequence() {
        let (header, rest) = decode_header(&[0x05, 0x01, 0x00, 0x02, 0xaa]).unwrap();
        assert_eq!(header, WireHeader { packet_length: 0x0105, packet_number: 2 });
        assert_eq!(rest, &[0xaa]);
        assert_eq!(encode_header(header), [0x05, 0x01, 0x00, 0x02]);
    }

    #[test]
    fn oversized_payload_spans_continuation_frames() {
        let query = "x".repeat(MAX_FRAME_PAYLOAD);
        let packet = MySqlPacket {
            header: MySqlPacketHeader { packet_length: 0, packet_number: 0, packet_type: "COM_QUERY".into() },
            message: MySqlMessage::Query(ComQuery { query: query.clone(), query_attributes: false }),
        };
        let wire = encode_message(&packet);
        assert_eq!(&wire[..4], &[0xff, 0xff, 0xff, 0x00]);
        let second = 4 + MAX_FRAME_PAYLOAD;
        assert_eq!(&wire[second..second + 4], &[0x01, 0x00, 0x00, 0x01]);
        assert_eq!(wire.len(), 2 * 4 + MAX_FRAME_PAYLOAD + 1);

        let mut ctx = DecodeContext::default();
        let (back, used) = decode_request(&wire, &mut ctx).unwrap();
        assert_eq!(used, wire.len());
        assert_eq!(back.message, packet.message);
        assert_eq!(encode_message(&back), wire);
    }

    #[test]
    fn exact_frame_size_is_followed_by_an_empty_frame() {
        let mut out = Vec::new();
        push_frame(&mut out, 7, &vec![0u8; MAX_FRAME_PAYLOAD]);
        assert_eq!(out.len(), 2 * 4 + MAX_FRAME_PAYLOAD);
        assert_eq!(&out[out.len() - 4..], &[0, 0, 0, 8]);

        let mut r = Reader::new(&out);
        let (header, payload) = read_frame(&mut r).unwrap();
        assert_eq!(header.packet_number, 7);
        assert_eq!(payload.len(), MAX_FRAME_PAYLOAD);
        assert!(r.is_empty());
    }

    #[test]
    fn truncated_header_names_the_field() {
        let err = decode_header(&[0x01, 0x00]).unwrap_err();
        assert!(err.to_string().contains("packet header"));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut ctx = DecodeContext::default();
        let err = decode_request(&[0x09, 0x00, 0x00, 0x00, COM_QUERY, b'S'], &mut ctx).unwrap_err();
        assert!(matches!(err, DecodeError::Short { .. }));
    }

    #[test]
    fn query_round_trips_with_recomputed_length() {
        let mut wire = vec![0x09, 0x00, 0x00, 0x00, COM_QUERY];
        wire.extend_from_slice(b"SELECT 1");
        let mut ctx = DecodeContext::default();
        let (packet, used) = decode_request(&wire, &mut ctx).unwrap();
        assert_eq!(used, wire.len());
        assert_eq!(packet.header.packet_type, "COM_QUERY");
        assert_eq!(
            packet.message,
            MySqlMessage::Query(ComQuery { query: "SELECT 1".into(), query_attributes: false })
        );
        assert_eq!(encode_message(&packet), wire);
        assert_eq!(ctx.last_command, Some(COM_QUERY));
    }

    #[test]
    fn ssl_request_is_kept_raw() {
        let mut payload = vec![0u8; 32];
        payload[..4].copy_from_slice(&(capability::SSL | capability::PROTOCOL_41).to_le_bytes());
        let mut wire = vec![32, 0, 0, 1];
        wire.extend_from_slice(&payload);
        let mut ctx = DecodeContext { phase: Phase::HandshakeResponse, ..DecodeContext::handshake() };
        let (packet, _) = decode_request(&wire, &mut ctx).unwrap();
        assert_eq!(packet.header.packet_type, "RAW");
        assert_eq!(ctx.phase, Phase::HandshakeResponse);
    }
}
