//! Connection-phase packets: server greeting and client handshake response.

use super::super::reader::{put_cstr, put_lenenc_bytes, put_lenenc_int, Reader};
use super::super::DecodeError;
use crate::models::mysql::{capability, ConnectAttribute, HandshakeResponse41, HandshakeV10};

/// First byte of a `HandshakeV10` greeting.
pub(super) const PROTOCOL_VERSION: u8 = 0x0a;

const SCRAMBLE_PART1: usize = 8;

pub(super) fn decode_v10(payload: &[u8]) -> Result<HandshakeV10, DecodeError> {
    let mut r = Reader::new(payload);
    let protocol_version = r.u8("protocol version")?;
    let server_version = r.cstring("server version")?;
    let connection_id = r.u32_le("connection id")?;
    let mut auth_plugin_data = r.take(SCRAMBLE_PART1, "auth plugin data part 1")?.to_vec();
    let filler = r.u8("filler")?;
    let lower = r.u16_le("capability flags")?;
    let character_set = r.u8("character set")?;
    let status_flags = r.u16_le("status flags")?;
    let upper = r.u16_le("capability flags upper")?;
    let capability_flags = u32::from(lower) | u32::from(upper) << 16;
    let auth_plugin_data_len = r.u8("auth plugin data length")?;
    let mut reserved = [0u8; 10];
    reserved.copy_from_slice(r.take(10, "reserved")?);

    if capability_flags & capability::SECURE_CONNECTION != 0 {
        let len = usize::from(auth_plugin_data_len).saturating_sub(SCRAMBLE_PART1).max(13);
        auth_plugin_data.extend_from_slice(r.take(len, "auth plugin data part 2")?);
    }
    let auth_plugin_name = if capability_flags & capability::PLUGIN_AUTH != 0 && !r.is_empty() {
        Some(r.cstring("auth plugin name")?)
    } else {
        None
    };
    if !r.is_empty() {
        return Err(DecodeError::invalid("handshake", format!("{} trailing bytes", r.remaining())));
    }

    Ok(HandshakeV10 {
        protocol_version,
        server_version,
        connection_id,
        auth_plugin_data: auth_plugin_data.into(),
        filler,
        capability_flags,
        character_set,
        status_flags,
        auth_plugin_data_len,
        reserved,
        auth_plugin_name,
    })
}

pub(super) fn encode_v10(m: &HandshakeV10) -> Vec<u8> {
    let mut out = vec![m.protocol_version];
    put_cstr(&mut out, m.server_version.as_bytes());
    out.extend_from_slice(&m.connection_id.to_le_bytes());
    let data = m.auth_plugin_data.as_bytes();
    let split = data.len().min(SCRAMBLE_PART1);
    out.extend_from_slice(&data[..split]);
    out.resize(out.len() + SCRAMBLE_PART1 - split, 0);
    out.push(m.filler);
    let caps = m.capability_flags.to_le_bytes();
    out.extend_from_slice(&caps[..2]);
    out.push(m.character_set);
    out.extend_from_slice(&m.status_flags.to_le_bytes());
    out.extend_from_slice(&caps[2..]);
    out.push(m.auth_plugin_data_len);
    out.extend_from_slice(&m.reserved);
    out.extend_from_slice(&data[split..]);
    if let Some(name) = &m.auth_plugin_name {
        put_cstr(&mut out, name.as_bytes());
    }
    out
}

pub(super) fn decode_response41(payload: &[u8]) -> Result<HandshakeResponse41, DecodeError> {
    let mut r = Reader::new(payload);
    let capability_flags = r.u32_le("capability flags")?;
    let max_packet_size = r.u32_le("max packet size")?;
    let character_set = r.u8("character set")?;
    let mut reserved = [0u8; 23];
    reserved.copy_from_slice(r.take(23, "reserved")?);
    let username = r.cstring("username")?;
    let has = |flag: u32| capability_flags & flag != 0;

    let auth_response = if has(capability::PLUGIN_AUTH_LENENC_CLIENT_DATA) {
        r.lenenc_bytes("auth response")?.unwrap_or_default()
    } else if has(capability::SECURE_CONNECTION) {
        let len = r.u8("auth response length")?;
        r.take(usize::from(len), "auth response")?
    } else {
        r.cstr_bytes("auth response")?
    }
    .to_vec();

    let database = if has(capability::CONNECT_WITH_DB) && !r.is_empty() {
        Some(r.cstring("database")?)
    } else {
        None
    };
    let auth_plugin_name = if has(capability::PLUGIN_AUTH) && !r.is_empty() {
        Some(r.cstring("auth plugin name")?)
    } else {
        None
    };
    let connect_attributes = if has(capability::CONNECT_ATTRS) && !r.is_empty() {
        Some(decode_attributes(&mut r)?)
    } else {
        None
    };
    let zstd_compression_level = if has(capability::ZSTD_COMPRESSION_ALGORITHM) && !r.is_empty() {
        Some(r.u8("zstd compression level")?)
    } else {
        None
    };
    if !r.is_empty() {
        return Err(DecodeError::invalid(
            "handshake response",
            format!("{} trailing bytes", r.remaining()),
        ));
    }

    Ok(HandshakeResponse41 {
        capability_flags,
        max_packet_size,
        character_set,
        reserved,
        username,
        auth_response: auth_response.into(),
        database,
        auth_plugin_name,
        connect_attributes,
        zstd_compression_level,
    })
}

fn decode_attributes(r: &mut Reader<'_>) -> Result<Vec<ConnectAttribute>, DecodeError> {
    let total = r.lenenc_int("connect attributes length")?.unwrap_or(0);
    let total = usize::try_from(total)
        .map_err(|_| DecodeError::invalid("connect attributes length", "too large"))?;
    let mut block = Reader::new(r.take(total, "connect attributes")?);
    let mut attrs = Vec::new();
    while !block.is_empty() {
        let key = block.lenenc_string("connect attribute key")?;
        let value = block.lenenc_string("connect attribute value")?;
        attrs.push(ConnectAttribute { key, value });
    }
    Ok(attrs)
}

pub(super) fn encode_response41(m: &HandshakeResponse41) -> Vec<u8> {
    let has = |flag: u32| m.capability_flags & flag != 0;
    let mut out = Vec::new();
    out.extend_from_slice(&m.capability_flags.to_le_bytes());
    out.extend_from_slice(&m.max_packet_size.to_le_bytes());
    out.push(m.character_set);
    out.extend_from_slice(&m.reserved);
    put_cstr(&mut out, m.username.as_bytes());

    let auth = m.auth_response.as_bytes();
    if has(capability::PLUGIN_AUTH_LENENC_CLIENT_DATA) {
        put_lenenc_bytes(&mut out, auth);
    } else if has(capability::SECURE_CONNECTION) {
        out.push(u8::try_from(auth.len()).unwrap_or(u8::MAX));
        out.extend_from_slice(&auth[..auth.len().min(usize::from(u8::MAX))]);
    } else {
        put_cstr(&mut out, auth);
    }

    if let Some(db) = &m.database {
        put_cstr(&mut out, db.as_bytes());
    }
    if let Some(plugin) = &m.auth_plugin_name {
        put_cstr(&mut out, plugin.as_bytes());
    }
    if let Some(attrs) = &m.connect_attributes {
        let mut block = Vec::new();
        for attr in attrs {
            put_lenenc_bytes(&mut block, attr.key.as_bytes());
            put_lenenc_bytes(&mut block, attr.value.as_bytes());
        }
        put_lenenc_int(&mut out, block.len() as u64);
        out.extend_from_slice(&block);
    }
    if let Some(level) = m.zstd_compression_level {
        out.push(level);
    }
    out
}
