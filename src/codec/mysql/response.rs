//! Generic server responses and command-phase response dispatch.

use super::super::reader::{put_cstr, put_lenenc_int, Reader};
use super::super::DecodeError;
use super::{
    raw, resultset, DecodeContext, COM_QUERY, COM_STMT_EXECUTE, COM_STMT_PREPARE, MAX_FRAME_PAYLOAD,
};
use crate::models::mysql::{AuthData, AuthSwitchRequest, EofPacket, ErrPacket, MySqlMessage, OkPacket};

pub(super) const OK: u8 = 0x00;
pub(super) const AUTH_MORE_DATA: u8 = 0x01;
pub(super) const EOF: u8 = 0xfe;
pub(super) const AUTH_SWITCH: u8 = 0xfe;
pub(super) const ERR: u8 = 0xff;
const LOCAL_INFILE: u8 = 0xfb;

/// Payload length of a standalone `EOF_Packet`.
const EOF_LEN: usize = 5;

/// `true` for the frame that ends a row stream.
pub(super) fn is_terminator(payload: &[u8]) -> bool {
    match payload.first() {
        Some(&ERR) => true,
        Some(&EOF) => payload.len() < MAX_FRAME_PAYLOAD,
        _ => false,
    }
}

pub(super) fn decode_command_response(
    payload: &[u8],
    r: &mut Reader<'_>,
    ctx: &DecodeContext,
) -> Result<MySqlMessage, DecodeError> {
    let Some(&first) = payload.first() else {
        return Ok(raw(payload));
    };
    Ok(match (first, ctx.last_command) {
        (ERR, _) => decode_err(payload)?,
        (OK, Some(COM_STMT_PREPARE)) => {
            MySqlMessage::StmtPrepareOk(resultset::decode_prepare_ok(payload, r, ctx)?)
        }
        (OK, _) => MySqlMessage::Ok(decode_ok(payload)?),
        (EOF, _) if payload.len() == EOF_LEN => MySqlMessage::Eof(decode_eof(payload)?),
        (EOF, _) if ctx.deprecate_eof() => MySqlMessage::Ok(decode_ok(payload)?),
        (EOF, _) => raw(payload),
        (LOCAL_INFILE, Some(COM_QUERY | COM_STMT_EXECUTE)) => raw(payload),
        (_, Some(COM_QUERY)) => {
            MySqlMessage::ResultSet(resultset::decode_result_set(payload, r, ctx, false)?)
        }
        (_, Some(COM_STMT_EXECUTE)) => {
            MySqlMessage::ResultSet(resultset::decode_result_set(payload, r, ctx, true)?)
        }
        _ => raw(payload),
    })
}

pub(super) fn decode_ok(payload: &[u8]) -> Result<OkPacket, DecodeError> {
    let mut r = Reader::new(payload);
    let header = r.u8("ok header")?;
    let affected_rows = required_lenenc(&mut r, "affected rows")?;
    let last_insert_id = required_lenenc(&mut r, "last insert id")?;
    let status_flags = r.u16_le("status flags")?;
    let warnings = r.u16_le("warnings")?;
    let info = String::from_utf8(r.rest().to_vec()).map_err(|e| DecodeError::invalid("ok info", e))?;
    Ok(OkPacket { header, affected_rows, last_insert_id, status_flags, warnings, info })
}

pub(super) fn encode_ok(m: &OkPacket) -> Vec<u8> {
    let mut out = vec![m.header];
    put_lenenc_int(&mut out, m.affected_rows);
    put_lenenc_int(&mut out, m.last_insert_id);
    out.extend_from_slice(&m.status_flags.to_le_bytes());
    out.extend_from_slice(&m.warnings.to_le_bytes());
    out.extend_from_slice(m.info.as_bytes());
    out
}

fn required_lenenc(r: &mut Reader<'_>, field: &str) -> Result<u64, DecodeError> {
    r.lenenc_int(field)?.ok_or_else(|| DecodeError::invalid(field, "unexpected NULL"))
}

/// Decodes an ERR packet. A SQL state or message that is not UTF-8 keeps
/// the whole payload as `RAW` so that it re-encodes byte for byte.
pub(super) fn decode_err(payload: &[u8]) -> Result<MySqlMessage, DecodeError> {
    let mut r = Reader::new(payload);
    r.u8("err header")?;
    let error_code = r.u16_le("error code")?;
    let sql_state = if r.peek() == Some(b'#') {
        r.u8("sql state marker")?;
        match String::from_utf8(r.take(5, "sql state")?.to_vec()) {
            Ok(state) => Some(state),
            Err(_) => return Ok(raw(payload)),
        }
    } else {
        None
    };
    let Ok(error_message) = String::from_utf8(r.rest().to_vec()) else {
        return Ok(raw(payload));
    };
    Ok(MySqlMessage::Err(ErrPacket { error_code, sql_state, error_message }))
}

pub(super) fn encode_err(m: &ErrPacket) -> Vec<u8> {
    let mut out = vec![ERR];
    out.extend_from_slice(&m.error_code.to_le_bytes());
    if let Some(state) = &m.sql_state {
        out.push(b'#');
        out.extend_from_slice(state.as_bytes());
    }
    out.extend_from_slice(m.error_message.as_bytes());
    out
}

pub(super) fn decode_eof(payload: &[u8]) -> Result<EofPacket, DecodeError> {
    let mut r = Reader::new(payload);
    r.u8("eof header")?;
    let warnings = r.u16_le("warnings")?;
    let status_flags = r.u16_le("status flags")?;
    Ok(EofPacket { warnings, status_flags })
}

pub(super) fn encode_eof(m: &EofPacket) -> Vec<u8> {
    let mut out = vec![EOF];
    out.extend_from_slice(&m.warnings.to_le_bytes());
    out.extend_from_slice(&m.status_flags.to_le_bytes());
    out
}

pub(super) fn decode_auth_switch(payload: &[u8]) -> Result<AuthSwitchRequest, DecodeError> {
    let mut r = Reader::new(payload);
    r.u8("auth switch header")?;
    let plugin_name = r.cstring("auth plugin name")?;
    Ok(AuthSwitchRequest { plugin_name, plugin_data: r.rest().into() })
}

pub(super) fn encode_auth_switch(m: &AuthSwitchRequest) -> Vec<u8> {
    let mut out = vec![AUTH_SWITCH];
    put_cstr(&mut out, m.plugin_name.as_bytes());
    out.extend_from_slice(m.plugin_data.as_bytes());
    out
}

/// Auth exchange bytes; server more-data packets carry a `0x01` marker.
pub(super) fn decode_auth_data(payload: &[u8], marked: bool) -> Result<AuthData, DecodeError> {
    let mut r = Reader::new(payload);
    if marked {
        r.u8("auth more data header")?;
    }
    Ok(AuthData { data: r.rest().into() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_packet_round_trips() {
        let ok = OkPacket {
            header: OK,
            affected_rows: 300,
            last_insert_id: 7,
            status_flags: 0x0002,
            warnings: 1,
            info: "Rows matched: 1".into(),
        };
        let wire = encode_ok(&ok);
        assert_eq!(&wire[..4], &[0x00, 0xfc, 0x2c, 0x01]);
        assert_eq!(decode_ok(&wire).unwrap(), ok);
    }

    #[test]
    fn err_with_and_without_sql_state() {
        let wire = b"\xff\x48\x04#HY000No tables used";
        let MySqlMessage::Err(err) = decode_err(wire).unwrap() else { panic!("not an ERR") };
        assert_eq!(err.error_code, 1096);
        assert_eq!(err.sql_state.as_deref(), Some("HY000"));
        assert_eq!(err.error_message, "No tables used");
        assert_eq!(encode_err(&err), wire);

        let MySqlMessage::Err(bare) = decode_err(b"\xff\x48\x04oops").unwrap() else { panic!("not an ERR") };
        assert_eq!(bare.sql_state, None);
        assert_eq!(bare.error_message, "oops");
    }

    #[test]
    fn non_utf8_err_message_stays_raw() {
        let wire = b"\xff\x48\x04#HY000bad \xc3\x28 byte";
        let msg = decode_err(wire).unwrap();
        assert_eq!(msg.packet_type(), "RAW");
        assert_eq!(super::super::encode_payload(&msg), wire);
    }

    #[test]
    fn terminator_detection() {
        assert!(is_terminator(&[0xfe, 0, 0, 2, 0]));
        assert!(is_terminator(&[0xff, 0x48, 0x04]));
        assert!(!is_terminator(&[0x01, b'1']));
        assert!(!is_terminator(&[]));
    }

    #[test]
    fn eof_is_five_bytes() {
        let eof = EofPacket { warnings: 0, status_flags: 0x22 };
        let wire = encode_eof(&eof);
        assert_eq!(wire.len(), EOF_LEN);
        assert_eq!(decode_eof(&wire).unwrap(), eof);
    }

    #[test]
    fn auth_switch_keeps_plugin_data() {
        let m = AuthSwitchRequest {
            plugin_name: "mysql_native_password".into(),
            plugin_data: vec![1, 2, 3, 0].into(),
        };
        assert_eq!(decode_auth_switch(&encode_auth_switch(&m)).unwrap(), m);
    }
}
