//! Command-phase client packets.
//!
//! Commands whose bytes do not fit the typed layout exactly (extra bytes,
//! non-UTF-8 text, query attributes with bound parameters) are kept as
//! `RAW` so that encoding still reproduces them.

use super::super::reader::{put_cstr, Reader};
use super::super::DecodeError;
use super::{
    raw, DecodeContext, COM_CHANGE_USER, COM_INIT_DB, COM_PING, COM_QUERY, COM_QUIT,
    COM_STMT_CLOSE, COM_STMT_EXECUTE, COM_STMT_FETCH, COM_STMT_PREPARE, COM_STMT_RESET,
    COM_STMT_SEND_LONG_DATA,
};
use crate::models::mysql::{
    capability, ComChangeUser, ComInitDb, ComQuery, ComStmtExecute, ComStmtFetch,
    ComStmtPrepare, ComStmtSendLongData, MySqlMessage, StatementRef,
};

pub(super) fn decode(payload: &[u8], ctx: &mut DecodeContext) -> Result<MySqlMessage, DecodeError> {
    let Some((&command, body)) = payload.split_first() else {
        return Ok(raw(payload));
    };
    ctx.last_command = Some(command);
    let typed = match command {
        COM_QUIT if body.is_empty() => Some(MySqlMessage::Quit),
        COM_PING if body.is_empty() => Some(MySqlMessage::Ping),
        COM_QUERY => decode_query(body, ctx.client_has(capability::QUERY_ATTRIBUTES))?,
        COM_INIT_DB => text(body).map(|schema| MySqlMessage::InitDb(ComInitDb { schema })),
        COM_STMT_PREPARE => text(body).map(|query| MySqlMessage::StmtPrepare(ComStmtPrepare { query })),
        COM_STMT_EXECUTE => {
            let mut r = Reader::new(body);
            Some(MySqlMessage::StmtExecute(ComStmtExecute {
                statement_id: r.u32_le("statement id")?,
                flags: r.u8("execute flags")?,
                iteration_count: r.u32_le("iteration count")?,
                parameters: r.rest().into(),
            }))
        }
        COM_STMT_CLOSE | COM_STMT_RESET => {
            let mut r = Reader::new(body);
            let statement = StatementRef { statement_id: r.u32_le("statement id")? };
            r.is_empty().then(|| {
                if command == COM_STMT_CLOSE {
                    MySqlMessage::StmtClose(statement)
                } else {
                    MySqlMessage::StmtReset(statement)
                }
            })
        }
        COM_STMT_SEND_LONG_DATA => {
            let mut r = Reader::new(body);
            Some(MySqlMessage::StmtSendLongData(ComStmtSendLongData {
                statement_id: r.u32_le("statement id")?,
                parameter_id: r.u16_le("parameter id")?,
                data: r.rest().into(),
            }))
        }
        COM_STMT_FETCH => {
            let mut r = Reader::new(body);
            let fetch = ComStmtFetch {
                statement_id: r.u32_le("statement id")?,
                num_rows: r.u32_le("num rows")?,
            };
            r.is_empty().then_some(MySqlMessage::StmtFetch(fetch))
        }
        COM_CHANGE_USER => decode_change_user(body)?,
        _ => None,
    };
    Ok(typed.unwrap_or_else(|| raw(payload)))
}

fn text(bytes: &[u8]) -> Option<String> {
    String::from_utf8(bytes.to_vec()).ok()
}

fn decode_query(body: &[u8], query_attributes: bool) -> Result<Option<MySqlMessage>, DecodeError> {
    if !query_attributes {
        return Ok(text(body).map(|query| MySqlMessage::Query(ComQuery { query, query_attributes })));
    }
    let mut r = Reader::new(body);
    let parameter_count = r.lenenc_int("query parameter count")?;
    let parameter_sets = r.lenenc_int("query parameter set count")?;
    if parameter_count != Some(0) || parameter_sets != Some(1) {
        return Ok(None);
    }
    Ok(text(r.rest()).map(|query| MySqlMessage::Query(ComQuery { query, query_attributes })))
}

fn decode_change_user(body: &[u8]) -> Result<Option<MySqlMessage>, DecodeError> {
    let mut r = Reader::new(body);
    let Some(user) = text(r.cstr_bytes("change user name")?) else {
        return Ok(None);
    };
    let len = r.u8("change user auth length")?;
    let auth_response = r.take(usize::from(len), "change user auth response")?.into();
    let Some(database) = text(r.cstr_bytes("change user schema")?) else {
        return Ok(None);
    };
    Ok(Some(MySqlMessage::ChangeUser(ComChangeUser {
        user,
        auth_response,
        database,
        trailing: r.rest().into(),
    })))
}

pub(super) fn encode(message: &MySqlMessage) -> Vec<u8> {
    match message {
        MySqlMessage::Query(q) => {
            let mut out = vec![COM_QUERY];
            if q.query_attributes {
                out.extend_from_slice(&[0x00, 0x01]);
            }
            out.extend_from_slice(q.query.as_bytes());
            out
        }
        MySqlMessage::Ping => vec![COM_PING],
        MySqlMessage::Quit => vec![COM_QUIT],
        MySqlMessage::InitDb(m) => with_command(COM_INIT_DB, m.schema.as_bytes()),
        MySqlMessage::StmtPrepare(m) => with_command(COM_STMT_PREPARE, m.query.as_bytes()),
        MySqlMessage::StmtExecute(m) => {
            let mut out = vec![COM_STMT_EXECUTE];
            out.extend_from_slice(&m.statement_id.to_le_bytes());
            out.push(m.flags);
            out.extend_from_slice(&m.iteration_count.to_le_bytes());
            out.extend_from_slice(m.parameters.as_bytes());
            out
        }
        MySqlMessage::StmtClose(m) => with_command(COM_STMT_CLOSE, &m.statement_id.to_le_bytes()),
        MySqlMessage::StmtReset(m) => with_command(COM_STMT_RESET, &m.statement_id.to_le_bytes()),
        MySqlMessage::StmtSendLongData(m) => {
            let mut out = vec![COM_STMT_SEND_LONG_DATA];
            out.extend_from_slice(&m.statement_id.to_le_bytes());
            out.extend_from_slice(&m.parameter_id.to_le_bytes());
            out.extend_from_slice(m.data.as_bytes());
            out
        }
        MySqlMessage::StmtFetch(m) => {
            let mut out = vec![COM_STMT_FETCH];
            out.extend_from_slice(&m.statement_id.to_le_bytes());
            out.extend_from_slice(&m.num_rows.to_le_bytes());
            out
        }
        MySqlMessage::ChangeUser(m) => {
            let mut out = vec![COM_CHANGE_USER];
            put_cstr(&mut out, m.user.as_bytes());
            let auth = m.auth_response.as_bytes();
            let auth = &auth[..auth.len().min(usize::from(u8::MAX))];
            out.push(auth.len() as u8);
            out.extend_from_slice(auth);
            put_cstr(&mut out, m.database.as_bytes());
            out.extend_from_slice(m.trailing.as_bytes());
            out
        }
        _ => Vec::new(),
    }
}

fn with_command(command: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(command);
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(payload: &[u8]) -> MySqlMessage {
        decode(payload, &mut DecodeContext::default()).unwrap()
    }

    #[test]
    fn unit_commands() {
        assert_eq!(decode_one(&[COM_PING]), MySqlMessage::Ping);
        assert_eq!(decode_one(&[COM_QUIT]), MySqlMessage::Quit);
        assert_eq!(decode_one(&[COM_PING, 0]).packet_type(), "RAW");
    }

    #[test]
    fn unknown_command_byte_is_raw() {
        let msg = decode_one(&[0x1f, 1, 2]);
        assert_eq!(msg.packet_type(), "RAW");
        assert_eq!(super::super::encode_payload(&msg), vec![0x1f, 1, 2]);
    }

    #[test]
    fn execute_keeps_parameter_bytes() {
        let payload = [COM_STMT_EXECUTE, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0x00, 0x01, 0x08, 0x00, 7, 0, 0, 0, 0, 0, 0, 0];
        let msg = decode_one(&payload);
        let MySqlMessage::StmtExecute(exec) = &msg else { panic!("not an execute") };
        assert_eq!(exec.statement_id, 1);
        assert_eq!(exec.parameters.len(), 12);
        assert_eq!(encode(&msg), payload);
    }

    #[test]
    fn query_attributes_prefix() {
        let mut ctx = DecodeContext {
            client_capabilities: capability::PROTOCOL_41 | capability::QUERY_ATTRIBUTES,
            ..DecodeContext::default()
        };
        let payload = b"\x03\x00\x01SELECT 1";
        let msg = decode(payload, &mut ctx).unwrap();
        assert_eq!(msg, MySqlMessage::Query(ComQuery { query: "SELECT 1".into(), query_attributes: true }));
        assert_eq!(encode(&msg), payload);

        let bound = b"\x03\x01\x01\x00\x01\xfe\x00\x01a\x01xSELECT ?";
        assert_eq!(decode(bound, &mut ctx).unwrap().packet_type(), "RAW");
    }

    #[test]
    fn change_user_keeps_trailing_fields() {
        let mut payload = vec![COM_CHANGE_USER];
        payload.extend_from_slice(b"bob\0");
        payload.push(3);
        payload.extend_from_slice(&[9, 9, 9]);
        payload.extend_from_slice(b"shop\0");
        payload.extend_from_slice(&[0x21, 0x00]);
        payload.extend_from_slice(b"mysql_native_password\0");
        let msg = decode_one(&payload);
        let MySqlMessage::ChangeUser(change) = &msg else { panic!("not a change user") };
        assert_eq!(change.user, "bob");
        assert_eq!(change.database, "shop");
        assert_eq!(encode(&msg), payload);
    }

    #[test]
    fn close_with_extra_bytes_is_raw() {
        assert_eq!(decode_one(&[COM_STMT_CLOSE, 1, 0, 0, 0]), MySqlMessage::StmtClose(StatementRef { statement_id: 1 }));
        assert_eq!(decode_one(&[COM_STMT_CLOSE, 1, 0, 0, 0, 9]).packet_type(), "RAW");
    }
}
