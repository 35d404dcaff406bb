//! MySQL client/server protocol models.
//!
//! Every packet carries a [`MySqlPacketHeader`] whose `packet_type` tag is
//! not part of the wire format; the decoder assigns it from the connection
//! phase and command byte, and it selects the shape of the persisted
//! `message` on load.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Blob, MockTimestamps};

/// Capability flags referenced by the codec.
pub mod capability {
    /// Database name follows the auth response.
    pub const CONNECT_WITH_DB: u32 = 0x0000_0008;
    /// 4.1 protocol (status and warnings in OK/EOF, SQL state in ERR).
    pub const PROTOCOL_41: u32 = 0x0000_0200;
    /// Client requests TLS.
    pub const SSL: u32 = 0x0000_0800;
    /// Auth response is length-prefixed by one byte.
    pub const SECURE_CONNECTION: u32 = 0x0000_8000;
    /// Auth plugin names are exchanged.
    pub const PLUGIN_AUTH: u32 = 0x0008_0000;
    /// Connection attributes follow the plugin name.
    pub const CONNECT_ATTRS: u32 = 0x0010_0000;
    /// Auth response is length-encoded.
    pub const PLUGIN_AUTH_LENENC_CLIENT_DATA: u32 = 0x0020_0000;
    /// EOF packets are replaced by OK packets.
    pub const DEPRECATE_EOF: u32 = 0x0100_0000;
    /// A zstd level byte ends the handshake response.
    pub const ZSTD_COMPRESSION_ALGORITHM: u32 = 0x0400_0000;
    /// `COM_QUERY` carries a query-attribute prefix.
    pub const QUERY_ATTRIBUTES: u32 = 0x0800_0000;
}

/// Persisted packet header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MySqlPacketHeader {
    /// 24-bit payload length of the first frame.
    pub packet_length: u32,
    /// Sequence id of the first frame.
    pub packet_number: u8,
    /// Message discriminator assigned by the decoder.
    pub packet_type: String,
}

/// A raw sub-frame preserved byte for byte (EOF markers, terminators).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Sequence id.
    pub packet_number: u8,
    /// Frame payload.
    pub payload: Blob,
}

/// Initial server greeting (`Protocol::HandshakeV10`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeV10 {
    /// Always 10.
    pub protocol_version: u8,
    /// Human-readable server version.
    pub server_version: String,
    /// Server thread id.
    pub connection_id: u32,
    /// Both scramble parts concatenated (first 8 bytes are part one).
    pub auth_plugin_data: Blob,
    /// Filler byte after part one.
    pub filler: u8,
    /// Full 32-bit server capabilities.
    pub capability_flags: u32,
    /// Default collation.
    pub character_set: u8,
    /// Server status flags.
    pub status_flags: u16,
    /// Declared scramble length.
    pub auth_plugin_data_len: u8,
    /// Reserved bytes.
    pub reserved: [u8; 10],
    /// Default auth plugin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_plugin_name: Option<String>,
}

/// One key/value pair of the handshake's connection attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectAttribute {
    /// Attribute name, e.g. `_client_name`.
    pub key: String,
    /// Attribute value.
    pub value: String,
}

/// Client reply to the greeting (`Protocol::HandshakeResponse41`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse41 {
    /// Client capabilities.
    pub capability_flags: u32,
    /// Maximum packet size the client accepts.
    pub max_packet_size: u32,
    /// Client collation.
    pub character_set: u8,
    /// Fixed 23-byte reserved region.
    pub reserved: [u8; 23],
    /// Login user.
    pub username: String,
    /// Scrambled credential.
    pub auth_response: Blob,
    /// Initial schema when `CONNECT_WITH_DB` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Auth plugin when `PLUGIN_AUTH` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_plugin_name: Option<String>,
    /// Connection attributes when `CONNECT_ATTRS` is set, in wire order.
    /// Keys may repeat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_attributes: Option<Vec<ConnectAttribute>>,
    /// zstd level when zstd compression is negotiated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zstd_compression_level: Option<u8>,
}

/// `OK_Packet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkPacket {
    /// `0x00`, or `0xfe` when an OK replaces an EOF.
    pub header: u8,
    /// Rows changed.
    pub affected_rows: u64,
    /// Last generated id.
    pub last_insert_id: u64,
    /// Server status flags.
    pub status_flags: u16,
    /// Warning count.
    pub warnings: u16,
    /// Human-readable info and session-state data.
    #[serde(default)]
    pub info: String,
}

/// `ERR_Packet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrPacket {
    /// Server error number.
    pub error_code: u16,
    /// Five-character SQL state, present when marked with `#`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_state: Option<String>,
    /// Error text.
    pub error_message: String,
}

/// `EOF_Packet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EofPacket {
    /// Warning count.
    pub warnings: u16,
    /// Server status flags.
    pub status_flags: u16,
}

/// Server request to change auth method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSwitchRequest {
    /// Plugin to switch to.
    pub plugin_name: String,
    /// Plugin-specific data.
    pub plugin_data: Blob,
}

/// Opaque auth exchange bytes (switch response or more-data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthData {
    /// Plugin-specific payload.
    pub data: Blob,
}

/// `COM_QUERY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComQuery {
    /// SQL text.
    pub query: String,
    /// An empty query-attribute prefix precedes the text.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub query_attributes: bool,
}

/// `COM_INIT_DB`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComInitDb {
    /// Schema to switch to.
    pub schema: String,
}

/// `COM_STMT_PREPARE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComStmtPrepare {
    /// SQL text with `?` placeholders.
    pub query: String,
}

/// `COM_STMT_PREPARE_OK` with its parameter and column definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StmtPrepareOk {
    /// Server-assigned statement id.
    pub statement_id: u32,
    /// Result columns.
    pub num_columns: u16,
    /// Placeholders.
    pub num_params: u16,
    /// Reserved filler byte.
    pub filler: u8,
    /// Warning count.
    pub warning_count: u16,
    /// Optional `metadata_follows` byte.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_follows: Option<u8>,
    /// Parameter definitions.
    #[serde(default)]
    pub param_definitions: Vec<ColumnDefinition>,
    /// EOF after parameter definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eof_after_params: Option<RawFrame>,
    /// Column definitions.
    #[serde(default)]
    pub column_definitions: Vec<ColumnDefinition>,
    /// EOF after column definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eof_after_columns: Option<RawFrame>,
}

/// `COM_STMT_EXECUTE`; parameters are kept as their wire bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComStmtExecute {
    /// Statement to run.
    pub statement_id: u32,
    /// Cursor flags.
    pub flags: u8,
    /// Always 1.
    pub iteration_count: u32,
    /// Null bitmap, bind flag, types and values.
    #[serde(default)]
    pub parameters: Blob,
}

/// `COM_STMT_CLOSE` and `COM_STMT_RESET`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRef {
    /// Target statement.
    pub statement_id: u32,
}

/// `COM_STMT_SEND_LONG_DATA`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComStmtSendLongData {
    /// Target statement.
    pub statement_id: u32,
    /// Parameter index.
    pub parameter_id: u16,
    /// Chunk of parameter data.
    pub data: Blob,
}

/// `COM_STMT_FETCH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComStmtFetch {
    /// Cursor statement.
    pub statement_id: u32,
    /// Rows to fetch.
    pub num_rows: u32,
}

/// `COM_CHANGE_USER`; fields after the schema are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComChangeUser {
    /// New user.
    pub user: String,
    /// One-byte-length-prefixed auth response.
    pub auth_response: Blob,
    /// New schema.
    pub database: String,
    /// Character set, plugin name and attributes.
    #[serde(default)]
    pub trailing: Blob,
}

/// `Protocol::ColumnDefinition41`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Sequence id of this frame.
    pub packet_number: u8,
    /// Always `def`.
    pub catalog: String,
    /// Schema.
    pub schema: String,
    /// Table alias.
    pub table: String,
    /// Physical table.
    pub org_table: String,
    /// Column alias.
    pub name: String,
    /// Physical column.
    pub org_name: String,
    /// Length of the fixed fields (0x0c).
    pub fixed_length: u64,
    /// Column collation.
    pub character_set: u16,
    /// Maximum display length.
    pub column_length: u32,
    /// `enum_field_types` value.
    pub column_type: u8,
    /// Column flags.
    pub flags: u16,
    /// Shown decimals.
    pub decimals: u8,
    /// Filler and any trailing bytes.
    #[serde(default)]
    pub filler: Blob,
}

/// One text-protocol cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// UTF-8 value.
    Text(String),
    /// Non-UTF-8 value.
    Bytes {
        /// Raw value.
        base64: Blob,
    },
}

impl Cell {
    /// Builds a cell from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::Text(text.to_string()),
            Err(_) => Self::Bytes { base64: Blob::from(bytes) },
        }
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes { base64 } => base64.as_bytes(),
        }
    }
}

/// A text-protocol row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRow {
    /// Sequence id of this frame.
    pub packet_number: u8,
    /// Cells; `None` is SQL NULL.
    pub values: Vec<Option<Cell>>,
}

/// A binary-protocol row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryRow {
    /// Sequence id of this frame.
    pub packet_number: u8,
    /// NULL bitmap with the two-bit offset.
    pub null_bitmap: Blob,
    /// Wire bytes of each value; `None` where the bitmap marks NULL.
    pub values: Vec<Option<Blob>>,
}

/// Rows of a result set in either protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rows {
    /// Response to `COM_QUERY`.
    Text(Vec<TextRow>),
    /// Response to `COM_STMT_EXECUTE`.
    Binary(Vec<BinaryRow>),
}

impl Rows {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(rows) => rows.len(),
            Self::Binary(rows) => rows.len(),
        }
    }

    /// `true` when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A complete result set spanning several frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Number of columns announced by the first frame.
    pub column_count: u64,
    /// Column definitions.
    pub columns: Vec<ColumnDefinition>,
    /// EOF frame after the definitions, absent with `DEPRECATE_EOF`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eof_after_columns: Option<RawFrame>,
    /// Row frames.
    pub rows: Rows,
    /// Terminating EOF, OK or ERR frame.
    pub terminator: RawFrame,
}

/// A decoded MySQL message; the variant determines `packet_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MySqlMessage {
    /// `HANDSHAKE_V10`
    HandshakeV10(HandshakeV10),
    /// `HANDSHAKE_RESPONSE`
    HandshakeResponse(HandshakeResponse41),
    /// `HANDSHAKE_RESPONSE_OK`
    HandshakeResponseOk(OkPacket),
    /// `AUTH_SWITCH_REQUEST`
    AuthSwitchRequest(AuthSwitchRequest),
    /// `AUTH_SWITCH_RESPONSE`
    AuthSwitchResponse(AuthData),
    /// `AUTH_MORE_DATA`
    AuthMoreData(AuthData),
    /// `COM_QUERY`
    Query(ComQuery),
    /// `COM_PING`
    Ping,
    /// `COM_QUIT`
    Quit,
    /// `COM_INIT_DB`
    InitDb(ComInitDb),
    /// `COM_STMT_PREPARE`
    StmtPrepare(ComStmtPrepare),
    /// `COM_STMT_PREPARE_OK`
    StmtPrepareOk(StmtPrepareOk),
    /// `COM_STMT_EXECUTE`
    StmtExecute(ComStmtExecute),
    /// `COM_STMT_CLOSE`
    StmtClose(StatementRef),
    /// `COM_STMT_RESET`
    StmtReset(StatementRef),
    /// `COM_STMT_SEND_LONG_DATA`
    StmtSendLongData(ComStmtSendLongData),
    /// `COM_STMT_FETCH`
    StmtFetch(ComStmtFetch),
    /// `COM_CHANGE_USER`
    ChangeUser(ComChangeUser),
    /// `RESULT_SET`
    ResultSet(ResultSet),
    /// `OK`
    Ok(OkPacket),
    /// `ERR`
    Err(ErrPacket),
    /// `EOF`
    Eof(EofPacket),
    /// `RAW`: a payload with no typed decoder.
    Raw(RawPayload),
}

/// Payload bytes of an untyped packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPayload {
    /// Frame payload.
    pub payload: Blob,
}

impl MySqlMessage {
    /// The persisted `packet_type` tag.
    #[must_use]
    pub fn packet_type(&self) -> &'static str {
        match self {
            Self::HandshakeV10(_) => "HANDSHAKE_V10",
            Self::HandshakeResponse(_) => "HANDSHAKE_RESPONSE",
            Self::HandshakeResponseOk(_) => "HANDSHAKE_RESPONSE_OK",
            Self::AuthSwitchRequest(_) => "AUTH_SWITCH_REQUEST",
            Self::AuthSwitchResponse(_) => "AUTH_SWITCH_RESPONSE",
            Self::AuthMoreData(_) => "AUTH_MORE_DATA",
            Self::Query(_) => "COM_QUERY",
            Self::Ping => "COM_PING",
            Self::Quit => "COM_QUIT",
            Self::InitDb(_) => "COM_INIT_DB",
            Self::StmtPrepare(_) => "COM_STMT_PREPARE",
            Self::StmtPrepareOk(_) => "COM_STMT_PREPARE_OK",
            Self::StmtExecute(_) => "COM_STMT_EXECUTE",
            Self::StmtClose(_) => "COM_STMT_CLOSE",
            Self::StmtReset(_) => "COM_STMT_RESET",
            Self::StmtSendLongData(_) => "COM_STMT_SEND_LONG_DATA",
            Self::StmtFetch(_) => "COM_STMT_FETCH",
            Self::ChangeUser(_) => "COM_CHANGE_USER",
            Self::ResultSet(_) => "RESULT_SET",
            Self::Ok(_) => "OK",
            Self::Err(_) => "ERR",
            Self::Eof(_) => "EOF",
            Self::Raw(_) => "RAW",
        }
    }

    fn from_value(packet_type: &str, value: serde_yaml::Value) -> Result<Self, String> {
        fn body<T: serde::de::DeserializeOwned>(v: serde_yaml::Value) -> Result<T, String> {
            serde_yaml::from_value(v).map_err(|e| e.to_string())
        }
        Ok(match packet_type {
            "HANDSHAKE_V10" => Self::HandshakeV10(body(value)?),
            "HANDSHAKE_RESPONSE" => Self::HandshakeResponse(body(value)?),
            "HANDSHAKE_RESPONSE_OK" => Self::HandshakeResponseOk(body(value)?),
            "AUTH_SWITCH_REQUEST" => Self::AuthSwitchRequest(body(value)?),
            "AUTH_SWITCH_RESPONSE" => Self::AuthSwitchResponse(body(value)?),
            "AUTH_MORE_DATA" => Self::AuthMoreData(body(value)?),
            "COM_QUERY" => Self::Query(body(value)?),
            "COM_PING" => Self::Ping,
            "COM_QUIT" => Self::Quit,
            "COM_INIT_DB" => Self::InitDb(body(value)?),
            "COM_STMT_PREPARE" => Self::StmtPrepare(body(value)?),
            "COM_STMT_PREPARE_OK" => Self::StmtPrepareOk(body(value)?),
            "COM_STMT_EXECUTE" => Self::StmtExecute(body(value)?),
            "COM_STMT_CLOSE" => Self::StmtClose(body(value)?),
            "COM_STMT_RESET" => Self::StmtReset(body(value)?),
            "COM_STMT_SEND_LONG_DATA" => Self::StmtSendLongData(body(value)?),
            "COM_STMT_FETCH" => Self::StmtFetch(body(value)?),
            "COM_CHANGE_USER" => Self::ChangeUser(body(value)?),
            "RESULT_SET" => Self::ResultSet(body(value)?),
            "OK" => Self::Ok(body(value)?),
            "ERR" => Self::Err(body(value)?),
            "EOF" => Self::Eof(body(value)?),
            "RAW" => Self::Raw(body(value)?),
            other => return Err(format!("unknown packet_type `{other}`")),
        })
    }
}

/// A header together with its decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlPacket {
    /// Header of the first frame.
    pub header: MySqlPacketHeader,
    /// Decoded message.
    pub message: MySqlMessage,
}

#[derive(Serialize)]
struct PacketOut<'a, T: Serialize> {
    header: &'a MySqlPacketHeader,
    message: T,
}

#[derive(Deserialize)]
struct PacketIn {
    header: MySqlPacketHeader,
    #[serde(default)]
    message: serde_yaml::Value,
}

impl Serialize for MySqlPacket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let header = &self.header;
        match &self.message {
            MySqlMessage::HandshakeV10(m) => PacketOut { header, message: m }.serialize(serializer),
            MySqlMessage::HandshakeResponse(m) => {
                PacketOut { header, message: m }.serialize(serializer)
            }
            MySqlMessage::HandshakeResponseOk(m) | MySqlMessage::Ok(m) => {
                PacketOut { header, message: m }.serialize(serializer)
            }
            MySqlMessage::AuthSwitchRequest(m) => {
                PacketOut { header, message: m }.serialize(serializer)
            }
            MySqlMessage::AuthSwitchResponse(m) | MySqlMessage::AuthMoreData(m) => {
                PacketOut { header, message: m }.serialize(serializer)
            }
            MySqlMessage::Query(m) => PacketOut { header, message: m }.serialize(serializer),
            MySqlMessage::Ping | MySqlMessage::Quit => {
                PacketOut { header, message: () }.serialize(serializer)
            }
            MySqlMessage::InitDb(m) => PacketOut { header, message: m }.serialize(serializer),
            MySqlMessage::StmtPrepare(m) => PacketOut { header, message: m }.serialize(serializer),
            MySqlMessage::StmtPrepareOk(m) => {
                PacketOut { header, message: m }.serialize(serializer)
            }
            MySqlMessage::StmtExecute(m) => PacketOut { header, message: m }.serialize(serializer),
            MySqlMessage::StmtClose(m) | MySqlMessage::StmtReset(m) => {
                PacketOut { header, message: m }.serialize(serializer)
            }
            MySqlMessage::StmtSendLongData(m) => {
                PacketOut { header, message: m }.serialize(serializer)
            }
            MySqlMessage::StmtFetch(m) => PacketOut { header, message: m }.serialize(serializer),
            MySqlMessage::ChangeUser(m) => PacketOut { header, message: m }.serialize(serializer),
            MySqlMessage::ResultSet(m) => PacketOut { header, message: m }.serialize(serializer),
            MySqlMessage::Err(m) => PacketOut { header, message: m }.serialize(serializer),
            MySqlMessage::Eof(m) => PacketOut { header, message: m }.serialize(serializer),
            MySqlMessage::Raw(m) => PacketOut { header, message: m }.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for MySqlPacket {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let PacketIn { header, message } = PacketIn::deserialize(deserializer)?;
        let message = MySqlMessage::from_value(&header.packet_type, message).map_err(|e| {
            serde::de::Error::custom(format!(
                "message does not match packet_type {}: {e}",
                header.packet_type
            ))
        })?;
        Ok(Self { header, message })
    }
}

/// Spec of a MySQL mock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MySqlSpec {
    /// Free-form labels; `type: config` marks handshake traffic.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Client packets.
    #[serde(default)]
    pub requests: Vec<MySqlPacket>,
    /// Server packets.
    #[serde(default)]
    pub responses: Vec<MySqlPacket>,
    /// Unix seconds at record time.
    #[serde(default)]
    pub created: i64,
    /// Interaction timestamps.
    #[serde(flatten)]
    pub timestamps: MockTimestamps,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(packet_type: &str) -> MySqlPacketHeader {
        MySqlPacketHeader { packet_length: 0, packet_number: 0, packet_type: packet_type.into() }
    }

    #[test]
    fn message_shape_follows_packet_type() {
        let packet = MySqlPacket {
            header: header("COM_QUERY"),
            message: MySqlMessage::Query(ComQuery { query: "SELECT 1".into(), query_attributes: false }),
        };
        let yaml = serde_yaml::to_string(&packet).unwrap();
        assert!(yaml.contains("query: SELECT 1"));
        let back: MySqlPacket = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, packet);
    }

    #[test]
    fn unit_commands_persist_without_a_body() {
        let packet = MySqlPacket { header: header("COM_PING"), message: MySqlMessage::Ping };
        let back: MySqlPacket =
            serde_yaml::from_str(&serde_yaml::to_string(&packet).unwrap()).unwrap();
        assert_eq!(back.message, MySqlMessage::Ping);
    }

    #[test]
    fn unknown_packet_type_is_an_error() {
        let yaml = "header: {packet_length: 1, packet_number: 0, packet_type: COM_BOGUS}\nmessage: {}\n";
        let err = serde_yaml::from_str::<MySqlPacket>(yaml).unwrap_err();
        assert!(err.to_string().contains("COM_BOGUS"));
    }

    #[test]
    fn text_cells_fall_back_to_base64() {
        assert_eq!(Cell::from_bytes(b"42"), Cell::Text("42".into()));
        let cell = Cell::from_bytes(&[0xff]);
        assert_eq!(cell.as_bytes(), &[0xff]);
        let yaml = serde_yaml::to_string(&cell).unwrap();
        let back: Cell = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, cell);
    }
}
