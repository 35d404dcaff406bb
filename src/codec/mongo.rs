//! MongoDB wire-protocol codec.
//!
//! Every message starts with a 16-byte little-endian header whose opcode
//! selects the body layout. BSON documents are converted to and from
//! canonical extended JSON so that type tags survive persistence.

use bson::{Bson, Document};

use super::reader::{put_cstr, Reader};
use super::DecodeError;
use crate::models::mongo::{
    MongoHeader, MongoMessage, MongoPacket, OpCode, OpCompressed, OpDelete, OpGetMore, OpInsert,
    OpKillCursors, OpMsg, OpQuery, OpReply, OpUpdate, Section,
};

/// Size of the standard message header.
pub const HEADER_LEN: usize = 16;

const SECTION_BODY: u8 = 0;
const SECTION_SEQUENCE: u8 = 1;
const CHECKSUM_LEN: usize = 4;

/// Reads the 16-byte header.
///
/// # Errors
///
/// Returns an error if fewer than 16 bytes are available.
pub fn decode_header(buf: &[u8]) -> Result<MongoHeader, DecodeError> {
    let mut r = Reader::new(buf);
    Ok(MongoHeader {
        length: r.i32_le("message length")?,
        request_id: r.i32_le("request id")?,
        response_to: r.i32_le("response to")?,
        opcode: OpCode::from(r.i32_le("opcode")?),
    })
}

/// Decodes one message from the start of `buf`, returning it with the
/// number of bytes consumed.
///
/// Unknown opcodes decode to [`MongoMessage::Unknown`] holding the body.
///
/// # Errors
///
/// Returns an error if the header or body is truncated or malformed.
pub fn decode_message(buf: &[u8]) -> Result<(MongoPacket, usize), DecodeError> {
    let header = decode_header(buf)?;
    let length = usize::try_from(header.length)
        .ok()
        .filter(|&len| len >= HEADER_LEN)
        .ok_or_else(|| DecodeError::invalid("message length", header.length))?;
    if buf.len() < length {
        return Err(DecodeError::short("message body", length, buf.len()));
    }
    let mut r = Reader::new(&buf[HEADER_LEN..length]);
    let message = match header.opcode {
        OpCode::Msg => MongoMessage::Msg(decode_op_msg(&mut r)?),
        OpCode::Reply => MongoMessage::Reply(OpReply {
            response_flags: r.i32_le("response flags")?,
            cursor_id: r.i64_le("cursor id")?,
            starting_from: r.i32_le("starting from")?,
            number_returned: r.i32_le("number returned")?,
            documents: read_documents(&mut r)?,
        }),
        OpCode::Query => MongoMessage::Query(OpQuery {
            flags: r.i32_le("query flags")?,
            full_collection_name: r.cstring("full collection name")?,
            number_to_skip: r.i32_le("number to skip")?,
            number_to_return: r.i32_le("number to return")?,
            query: read_document(&mut r)?,
            return_fields_selector: if r.is_empty() { None } else { Some(read_document(&mut r)?) },
        }),
        OpCode::Insert => MongoMessage::Insert(OpInsert {
            flags: r.i32_le("insert flags")?,
            full_collection_name: r.cstring("full collection name")?,
            documents: read_documents(&mut r)?,
        }),
        OpCode::Update => MongoMessage::Update(OpUpdate {
            zero: r.i32_le("zero")?,
            full_collection_name: r.cstring("full collection name")?,
            flags: r.i32_le("update flags")?,
            selector: read_document(&mut r)?,
            update: read_document(&mut r)?,
        }),
        OpCode::Delete => MongoMessage::Delete(OpDelete {
            zero: r.i32_le("zero")?,
            full_collection_name: r.cstring("full collection name")?,
            flags: r.i32_le("delete flags")?,
            selector: read_document(&mut r)?,
        }),
        OpCode::GetMore => MongoMessage::GetMore(OpGetMore {
            zero: r.i32_le("zero")?,
            full_collection_name: r.cstring("full collection name")?,
            number_to_return: r.i32_le("number to return")?,
            cursor_id: r.i64_le("cursor id")?,
        }),
        OpCode::KillCursors => {
            let zero = r.i32_le("zero")?;
            let count = r.i32_le("number of cursor ids")?;
            let count = usize::try_from(count)
                .map_err(|_| DecodeError::invalid("number of cursor ids", count))?;
            let mut cursor_ids = Vec::with_capacity(count.min(r.remaining() / 8));
            for _ in 0..count {
                cursor_ids.push(r.i64_le("cursor id")?);
            }
            MongoMessage::KillCursors(OpKillCursors { zero, cursor_ids })
        }
        OpCode::Compressed => MongoMessage::Compressed(OpCompressed {
            original_opcode: r.i32_le("original opcode")?,
            uncompressed_size: r.i32_le("uncompressed size")?,
            compressor_id: r.u8("compressor id")?,
            compressed_message: r.rest().into(),
        }),
        OpCode::Unknown(opcode) => MongoMessage::Unknown { opcode, raw: r.rest().into() },
    };
    if !r.is_empty() {
        return Err(DecodeError::invalid(
            "message body",
            format!("{} trailing bytes", r.remaining()),
        ));
    }
    Ok((MongoPacket { header, message }, length))
}

fn decode_op_msg(r: &mut Reader<'_>) -> Result<OpMsg, DecodeError> {
    let flag_bits = r.u32_le("flag bits")?;
    let mut sections = Vec::new();
    while r.remaining() > CHECKSUM_LEN {
        match r.u8("section kind")? {
            SECTION_BODY => sections.push(Section::Body { document: read_document(r)? }),
            SECTION_SEQUENCE => {
                let size = r.i32_le("section size")?;
                let body_len = usize::try_from(size)
                    .ok()
                    .and_then(|s| s.checked_sub(4))
                    .ok_or_else(|| DecodeError::invalid("section size", size))?;
                let mut seq = Reader::new(r.take(body_len, "document sequence")?);
                let identifier = seq.cstring("sequence identifier")?;
                let documents = read_documents(&mut seq)?;
                sections.push(Section::DocumentSequence { identifier, documents });
            }
            kind => return Err(DecodeError::invalid("section kind", kind)),
        }
    }
    let checksum = match r.remaining() {
        0 => None,
        CHECKSUM_LEN => Some(r.u32_le("checksum")?),
        _ => {
            r.rest();
            None
        }
    };
    Ok(OpMsg { flag_bits, sections, checksum })
}

fn read_document(r: &mut Reader<'_>) -> Result<String, DecodeError> {
    let len = r.clone().i32_le("document length")?;
    let len = usize::try_from(len).map_err(|_| DecodeError::invalid("document length", len))?;
    document_to_extjson(r.take(len, "document")?)
}

fn read_documents(r: &mut Reader<'_>) -> Result<Vec<String>, DecodeError> {
    let mut documents = Vec::new();
    while !r.is_empty() {
        documents.push(read_document(r)?);
    }
    Ok(documents)
}

/// Converts one BSON document to canonical extended JSON.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid BSON document.
pub fn document_to_extjson(mut bytes: &[u8]) -> Result<String, DecodeError> {
    let doc = Document::from_reader(&mut bytes).map_err(|e| DecodeError::invalid("document", e))?;
    Ok(Bson::Document(doc).into_canonical_extjson().to_string())
}

/// Converts canonical extended JSON back to BSON bytes.
///
/// # Errors
///
/// Returns an error if the text is not JSON or not a document.
pub fn extjson_to_document(json: &str) -> Result<Vec<u8>, DecodeError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| DecodeError::invalid("extended json", e))?;
    let Bson::Document(doc) =
        Bson::try_from(value).map_err(|e| DecodeError::invalid("extended json", e))?
    else {
        return Err(DecodeError::invalid("extended json", "not a document"));
    };
    let mut out = Vec::new();
    doc.to_writer(&mut out).map_err(|e| DecodeError::invalid("document", e))?;
    Ok(out)
}

/// Encodes a message back to wire bytes. The header length is recomputed
/// from the body.
///
/// # Errors
///
/// Returns an error if a stored document is not valid extended JSON.
pub fn encode_message(packet: &MongoPacket) -> Result<Vec<u8>, DecodeError> {
    let mut body = Vec::new();
    match &packet.message {
        MongoMessage::Msg(m) => {
            body.extend_from_slice(&m.flag_bits.to_le_bytes());
            for section in &m.sections {
                match section {
                    Section::Body { document } => {
                        body.push(SECTION_BODY);
                        body.extend_from_slice(&extjson_to_document(document)?);
                    }
                    Section::DocumentSequence { identifier, documents } => {
                        let mut seq = Vec::new();
                        put_cstr(&mut seq, identifier.as_bytes());
                        put_documents(&mut seq, documents)?;
                        body.push(SECTION_SEQUENCE);
                        body.extend_from_slice(&len_i32(seq.len() + 4).to_le_bytes());
                        body.extend_from_slice(&seq);
                    }
                }
            }
            if let Some(checksum) = m.checksum {
                body.extend_from_slice(&checksum.to_le_bytes());
            }
        }
        MongoMessage::Reply(m) => {
            body.extend_from_slice(&m.response_flags.to_le_bytes());
            body.extend_from_slice(&m.cursor_id.to_le_bytes());
            body.extend_from_slice(&m.starting_from.to_le_bytes());
            body.extend_from_slice(&m.number_returned.to_le_bytes());
            put_documents(&mut body, &m.documents)?;
        }
        MongoMessage::Query(m) => {
            body.extend_from_slice(&m.flags.to_le_bytes());
            put_cstr(&mut body, m.full_collection_name.as_bytes());
            body.extend_from_slice(&m.number_to_skip.to_le_bytes());
            body.extend_from_slice(&m.number_to_return.to_le_bytes());
            body.extend_from_slice(&extjson_to_document(&m.query)?);
            if let Some(selector) = &m.return_fields_selector {
                body.extend_from_slice(&extjson_to_document(selector)?);
            }
        }
        MongoMessage::Insert(m) => {
            body.extend_from_slice(&m.flags.to_le_bytes());
            put_cstr(&mut body, m.full_collection_name.as_bytes());
            put_documents(&mut body, &m.documents)?;
        }
        MongoMessage::Update(m) => {
            body.extend_from_slice(&m.zero.to_le_bytes());
            put_cstr(&mut body, m.full_collection_name.as_bytes());
            body.extend_from_slice(&m.flags.to_le_bytes());
            body.extend_from_slice(&extjson_to_document(&m.selector)?);
            body.extend_from_slice(&extjson_to_document(&m.update)?);
        }
        MongoMessage::Delete(m) => {
            body.extend_from_slice(&m.zero.to_le_bytes());
            put_cstr(&mut body, m.full_collection_name.as_bytes());
            body.extend_from_slice(&m.flags.to_le_bytes());
            body.extend_from_slice(&extjson_to_document(&m.selector)?);
        }
        MongoMessage::GetMore(m) => {
            body.extend_from_slice(&m.zero.to_le_bytes());
            put_cstr(&mut body, m.full_collection_name.as_bytes());
            body.extend_from_slice(&m.number_to_return.to_le_bytes());
            body.extend_from_slice(&m.cursor_id.to_le_bytes());
        }
        MongoMessage::KillCursors(m) => {
            body.extend_from_slice(&m.zero.to_le_bytes());
            body.extend_from_slice(&len_i32(m.cursor_ids.len()).to_le_bytes());
            for id in &m.cursor_ids {
                body.extend_from_slice(&id.to_le_bytes());
            }
        }
        MongoMessage::Compressed(m) => {
            body.extend_from_slice(&m.original_opcode.to_le_bytes());
            body.extend_from_slice(&m.uncompressed_size.to_le_bytes());
            body.push(m.compressor_id);
            body.extend_from_slice(m.compressed_message.as_bytes());
        }
        MongoMessage::Unknown { raw, .. } => body.extend_from_slice(raw.as_bytes()),
    }

    let header = &packet.header;
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&len_i32(HEADER_LEN + body.len()).to_le_bytes());
    out.extend_from_slice(&header.request_id.to_le_bytes());
    out.extend_from_slice(&header.response_to.to_le_bytes());
    out.extend_from_slice(&packet.message.opcode().code().to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

fn put_documents(out: &mut Vec<u8>, documents: &[String]) -> Result<(), DecodeError> {
    for document in documents {
        out.extend_from_slice(&extjson_to_document(document)?);
    }
    Ok(())
}

fn len_i32(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use proptest::prelude::*;

    fn bson_bytes(doc: &Document) -> Vec<u8> {
        let mut out = Vec::new();
        doc.to_writer(&mut out).unwrap();
        out
    }

    fn op_msg_ping(checksum: Option<u32>) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&0u32.to_le_bytes());
        body.push(SECTION_BODY);
        body.extend_from_slice(&bson_bytes(&doc! { "ping": 1 }));
        if let Some(c) = checksum {
            body.extend_from_slice(&c.to_le_bytes());
        }
        let mut wire = Vec::new();
        wire.extend_from_slice(&len_i32(HEADER_LEN + body.len()).to_le_bytes());
        wire.extend_from_slice(&7i32.to_le_bytes());
        wire.extend_from_slice(&0i32.to_le_bytes());
        wire.extend_from_slice(&2013i32.to_le_bytes());
        wire.extend_from_slice(&body);
        wire
    }

    #[test]
    fn op_msg_ping_with_checksum() {
        let wire = op_msg_ping(Some(0xdead_beef));
        let (packet, used) = decode_message(&wire).unwrap();
        assert_eq!(used, wire.len());
        assert_eq!(packet.header.request_id, 7);
        let MongoMessage::Msg(msg) = &packet.message else { panic!("not an OP_MSG") };
        assert_eq!(msg.flag_bits, 0);
        assert_eq!(msg.checksum, Some(0xdead_beef));
        assert_eq!(msg.sections.len(), 1);
        let Section::Body { document } = &msg.sections[0] else { panic!("not a body section") };
        assert_eq!(document, r#"{"ping":{"$numberInt":"1"}}"#);
        assert_eq!(encode_message(&packet).unwrap(), wire);
    }

    #[test]
    fn op_msg_without_checksum() {
        let wire = op_msg_ping(None);
        let (packet, _) = decode_message(&wire).unwrap();
        let MongoMessage::Msg(msg) = &packet.message else { panic!("not an OP_MSG") };
        assert_eq!(msg.checksum, None);
        assert_eq!(encode_message(&packet).unwrap(), wire);
    }

    #[test]
    fn document_sequence_section() {
        let docs = [doc! { "_id": 1, "name": "a" }, doc! { "_id": 2i64, "name": "b" }];
        let mut seq = Vec::new();
        put_cstr(&mut seq, b"documents");
        for d in &docs {
            seq.extend_from_slice(&bson_bytes(d));
        }
        let mut body = 0u32.to_le_bytes().to_vec();
        body.push(SECTION_BODY);
        body.extend_from_slice(&bson_bytes(&doc! { "insert": "users", "$db": "shop" }));
        body.push(SECTION_SEQUENCE);
        body.extend_from_slice(&len_i32(seq.len() + 4).to_le_bytes());
        body.extend_from_slice(&seq);
        let mut wire = len_i32(HEADER_LEN + body.len()).to_le_bytes().to_vec();
        wire.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0]);
        wire.extend_from_slice(&2013i32.to_le_bytes());
        wire.extend_from_slice(&body);

        let (packet, _) = decode_message(&wire).unwrap();
        let MongoMessage::Msg(msg) = &packet.message else { panic!("not an OP_MSG") };
        let Section::DocumentSequence { identifier, documents } = &msg.sections[1] else {
            panic!("not a sequence")
        };
        assert_eq!(identifier, "documents");
        assert_eq!(documents.len(), 2);
        assert!(documents[1].contains("$numberLong"));
        assert_eq!(encode_message(&packet).unwrap(), wire);
    }

    #[test]
    fn unknown_opcode_keeps_body() {
        let mut wire = 20i32.to_le_bytes().to_vec();
        wire.extend_from_slice(&[0; 8]);
        wire.extend_from_slice(&9999i32.to_le_bytes());
        wire.extend_from_slice(&[1, 2, 3, 4]);
        let (packet, _) = decode_message(&wire).unwrap();
        assert_eq!(packet.header.opcode, OpCode::Unknown(9999));
        assert_eq!(
            packet.message,
            MongoMessage::Unknown { opcode: 9999, raw: vec![1, 2, 3, 4].into() }
        );
        assert_eq!(encode_message(&packet).unwrap(), wire);
    }

    #[test]
    fn invalid_section_kind_is_an_error() {
        let mut wire = op_msg_ping(None);
        wire[20] = 7;
        let err = decode_message(&wire).unwrap_err();
        assert!(err.to_string().contains("section kind"));
    }

    #[test]
    fn truncated_body_is_short() {
        let wire = op_msg_ping(None);
        let err = decode_message(&wire[..wire.len() - 3]).unwrap_err();
        assert!(matches!(err, DecodeError::Short { .. }));
    }

    #[test]
    fn op_query_with_selector() {
        let packet = MongoPacket {
            header: MongoHeader { length: 0, request_id: 3, response_to: 0, opcode: OpCode::Query },
            message: MongoMessage::Query(OpQuery {
                flags: 0,
                full_collection_name: "admin.$cmd".into(),
                number_to_skip: 0,
                number_to_return: -1,
                query: r#"{"isMaster":{"$numberInt":"1"}}"#.into(),
                return_fields_selector: Some(r#"{"ok":{"$numberInt":"1"}}"#.into()),
            }),
        };
        let wire = encode_message(&packet).unwrap();
        let (back, used) = decode_message(&wire).unwrap();
        assert_eq!(used, wire.len());
        assert_eq!(back.message, packet.message);
        assert_eq!(back.header.length as usize, wire.len());
    }

    proptest! {
        #[test]
        fn op_reply_documents_survive(values in proptest::collection::vec(any::<i64>(), 0..5), cursor in any::<i64>()) {
            let documents: Vec<String> = values
                .iter()
                .map(|v| Bson::Document(doc! { "n": *v }).into_canonical_extjson().to_string())
                .collect();
            let packet = MongoPacket {
                header: MongoHeader { length: 0, request_id: 1, response_to: 9, opcode: OpCode::Reply },
                message: MongoMessage::Reply(OpReply {
                    response_flags: 8,
                    cursor_id: cursor,
                    starting_from: 0,
                    number_returned: i32::try_from(documents.len()).unwrap(),
                    documents,
                }),
            };
            let wire = encode_message(&packet).unwrap();
            let (back, _) = decode_message(&wire).unwrap();
            prop_assert_eq!(&back.message, &packet.message);
            prop_assert_eq!(encode_message(&back).unwrap(), wire);
        }
    }
}
