//! MongoDB wire-protocol models.
//!
//! BSON documents are held as canonical extended JSON strings so recorded
//! mocks stay diffable and keep every BSON type tag.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Blob, MockTimestamps};

/// Wire opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// `OP_REPLY` (1).
    Reply,
    /// `OP_UPDATE` (2001).
    Update,
    /// `OP_INSERT` (2002).
    Insert,
    /// `OP_QUERY` (2004).
    Query,
    /// `OP_GET_MORE` (2005).
    GetMore,
    /// `OP_DELETE` (2006).
    Delete,
    /// `OP_KILL_CURSORS` (2007).
    KillCursors,
    /// `OP_COMPRESSED` (2012).
    Compressed,
    /// `OP_MSG` (2013).
    Msg,
    /// Any other value.
    Unknown(i32),
}

impl OpCode {
    /// Numeric wire value.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Reply => 1,
            Self::Update => 2001,
            Self::Insert => 2002,
            Self::Query => 2004,
            Self::GetMore => 2005,
            Self::Delete => 2006,
            Self::KillCursors => 2007,
            Self::Compressed => 2012,
            Self::Msg => 2013,
            Self::Unknown(code) => code,
        }
    }
}

impl From<i32> for OpCode {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::Reply,
            2001 => Self::Update,
            2002 => Self::Insert,
            2004 => Self::Query,
            2005 => Self::GetMore,
            2006 => Self::Delete,
            2007 => Self::KillCursors,
            2012 => Self::Compressed,
            2013 => Self::Msg,
            other => Self::Unknown(other),
        }
    }
}

impl Serialize for OpCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(Self::from)
    }
}

/// The 16-byte standard message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoHeader {
    /// Total message length including the header.
    pub length: i32,
    /// Sender-assigned identifier.
    pub request_id: i32,
    /// `request_id` of the message being answered.
    pub response_to: i32,
    /// Body layout selector.
    pub opcode: OpCode,
}

/// One `OP_MSG` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Kind 0: a single body document.
    Body {
        /// Extended JSON document.
        document: String,
    },
    /// Kind 1: an identified sequence of documents.
    DocumentSequence {
        /// Sequence identifier, e.g. `documents`.
        identifier: String,
        /// Extended JSON documents.
        documents: Vec<String>,
    },
}

/// `OP_MSG` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpMsg {
    /// Flag bits; bit 0 is `checksumPresent`, bit 1 `moreToCome`.
    pub flag_bits: u32,
    /// Sections in wire order.
    pub sections: Vec<Section>,
    /// CRC-32C trailer when exactly four bytes followed the sections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u32>,
}

impl OpMsg {
    /// `true` when the sender does not expect a reply.
    #[must_use]
    pub fn more_to_come(&self) -> bool {
        self.flag_bits & 0b10 != 0
    }
}

/// `OP_REPLY` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpReply {
    /// Response flags.
    pub response_flags: i32,
    /// Open cursor, or 0.
    pub cursor_id: i64,
    /// Offset of the first returned document.
    pub starting_from: i32,
    /// Number of returned documents.
    pub number_returned: i32,
    /// Extended JSON documents.
    pub documents: Vec<String>,
}

/// `OP_QUERY` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpQuery {
    /// Query flags.
    pub flags: i32,
    /// `db.collection`.
    pub full_collection_name: String,
    /// Documents to skip.
    pub number_to_skip: i32,
    /// Batch size.
    pub number_to_return: i32,
    /// Extended JSON query document.
    pub query: String,
    /// Optional projection document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_fields_selector: Option<String>,
}

/// `OP_INSERT` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpInsert {
    /// Insert flags.
    pub flags: i32,
    /// `db.collection`.
    pub full_collection_name: String,
    /// Extended JSON documents.
    pub documents: Vec<String>,
}

/// `OP_UPDATE` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpUpdate {
    /// Reserved leading int32 (always 0 from conforming drivers).
    #[serde(default)]
    pub zero: i32,
    /// `db.collection`.
    pub full_collection_name: String,
    /// Update flags.
    pub flags: i32,
    /// Extended JSON selector.
    pub selector: String,
    /// Extended JSON update document.
    pub update: String,
}

/// `OP_DELETE` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpDelete {
    /// Reserved leading int32.
    #[serde(default)]
    pub zero: i32,
    /// `db.collection`.
    pub full_collection_name: String,
    /// Delete flags.
    pub flags: i32,
    /// Extended JSON selector.
    pub selector: String,
}

/// `OP_GET_MORE` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpGetMore {
    /// Reserved leading int32.
    #[serde(default)]
    pub zero: i32,
    /// `db.collection`.
    pub full_collection_name: String,
    /// Batch size.
    pub number_to_return: i32,
    /// Cursor to advance.
    pub cursor_id: i64,
}

/// `OP_KILL_CURSORS` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpKillCursors {
    /// Reserved leading int32.
    #[serde(default)]
    pub zero: i32,
    /// Cursors to close.
    pub cursor_ids: Vec<i64>,
}

/// `OP_COMPRESSED` body; the inner message is kept compressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpCompressed {
    /// Opcode of the wrapped message.
    pub original_opcode: i32,
    /// Size of the wrapped body once decompressed.
    pub uncompressed_size: i32,
    /// 0 noop, 1 snappy, 2 zlib, 3 zstd.
    pub compressor_id: u8,
    /// Compressed body.
    pub compressed_message: Blob,
}

/// An opcode-dispatched message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MongoMessage {
    /// `OP_MSG`.
    Msg(OpMsg),
    /// `OP_REPLY`.
    Reply(OpReply),
    /// `OP_QUERY`.
    Query(OpQuery),
    /// `OP_INSERT`.
    Insert(OpInsert),
    /// `OP_UPDATE`.
    Update(OpUpdate),
    /// `OP_DELETE`.
    Delete(OpDelete),
    /// `OP_GET_MORE`.
    GetMore(OpGetMore),
    /// `OP_KILL_CURSORS`.
    KillCursors(OpKillCursors),
    /// `OP_COMPRESSED`.
    Compressed(OpCompressed),
    /// An opcode this crate does not decode; the body is kept verbatim.
    Unknown {
        /// Wire opcode.
        opcode: i32,
        /// Body bytes following the header.
        raw: Blob,
    },
}

impl MongoMessage {
    /// The opcode this body is written under.
    #[must_use]
    pub fn opcode(&self) -> OpCode {
        match self {
            Self::Msg(_) => OpCode::Msg,
            Self::Reply(_) => OpCode::Reply,
            Self::Query(_) => OpCode::Query,
            Self::Insert(_) => OpCode::Insert,
            Self::Update(_) => OpCode::Update,
            Self::Delete(_) => OpCode::Delete,
            Self::GetMore(_) => OpCode::GetMore,
            Self::KillCursors(_) => OpCode::KillCursors,
            Self::Compressed(_) => OpCode::Compressed,
            Self::Unknown { opcode, .. } => OpCode::Unknown(*opcode),
        }
    }
}

/// Persisted body of an unknown opcode.
#[derive(Serialize, Deserialize)]
struct UnknownBody {
    raw: Blob,
}

/// A header together with its decoded body.
///
/// The persisted form is `{header, message}` where the shape of `message`
/// is selected by `header.opcode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoPacket {
    /// Wire header.
    pub header: MongoHeader,
    /// Decoded body.
    pub message: MongoMessage,
}

#[derive(Serialize)]
struct PacketOut<'a, T: Serialize> {
    header: &'a MongoHeader,
    message: T,
}

#[derive(Deserialize)]
struct PacketIn {
    header: MongoHeader,
    message: serde_yaml::Value,
}

impl Serialize for MongoPacket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let header = &self.header;
        match &self.message {
            MongoMessage::Msg(m) => PacketOut { header, message: m }.serialize(serializer),
            MongoMessage::Reply(m) => PacketOut { header, message: m }.serialize(serializer),
            MongoMessage::Query(m) => PacketOut { header, message: m }.serialize(serializer),
            MongoMessage::Insert(m) => PacketOut { header, message: m }.serialize(serializer),
            MongoMessage::Update(m) => PacketOut { header, message: m }.serialize(serializer),
            MongoMessage::Delete(m) => PacketOut { header, message: m }.serialize(serializer),
            MongoMessage::GetMore(m) => PacketOut { header, message: m }.serialize(serializer),
            MongoMessage::KillCursors(m) => PacketOut { header, message: m }.serialize(serializer),
            MongoMessage::Compressed(m) => PacketOut { header, message: m }.serialize(serializer),
            MongoMessage::Unknown { raw, .. } => {
                PacketOut { header, message: UnknownBody { raw: raw.clone() } }
                    .serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for MongoPacket {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let PacketIn { header, message } = PacketIn::deserialize(deserializer)?;
        let body = |e: serde_yaml::Error| {
            D::Error::custom(format!("message does not match opcode {}: {e}", header.opcode.code()))
        };
        let message = match header.opcode {
            OpCode::Msg => MongoMessage::Msg(serde_yaml::from_value(message).map_err(body)?),
            OpCode::Reply => MongoMessage::Reply(serde_yaml::from_value(message).map_err(body)?),
            OpCode::Query => MongoMessage::Query(serde_yaml::from_value(message).map_err(body)?),
            OpCode::Insert => MongoMessage::Insert(serde_yaml::from_value(message).map_err(body)?),
            OpCode::Update => MongoMessage::Update(serde_yaml::from_value(message).map_err(body)?),
            OpCode::Delete => MongoMessage::Delete(serde_yaml::from_value(message).map_err(body)?),
            OpCode::GetMore => {
                MongoMessage::GetMore(serde_yaml::from_value(message).map_err(body)?)
            }
            OpCode::KillCursors => {
                MongoMessage::KillCursors(serde_yaml::from_value(message).map_err(body)?)
            }
            OpCode::Compressed => {
                MongoMessage::Compressed(serde_yaml::from_value(message).map_err(body)?)
            }
            OpCode::Unknown(opcode) => {
                let UnknownBody { raw } = serde_yaml::from_value(message).map_err(body)?;
                MongoMessage::Unknown { opcode, raw }
            }
        };
        Ok(Self { header, message })
    }
}

/// Spec of a MongoDB mock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MongoSpec {
    /// Free-form labels; `type: config` marks handshake/heartbeat traffic.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Client messages.
    #[serde(default)]
    pub requests: Vec<MongoPacket>,
    /// Server messages.
    #[serde(default)]
    pub responses: Vec<MongoPacket>,
    /// Unix seconds at record time.
    #[serde(default)]
    pub created: i64,
    /// Interaction timestamps.
    #[serde(flatten)]
    pub timestamps: MockTimestamps,
}
