//! Postgres frontend/backend messages, kept opaque apart from framing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::generic::Origin;
use super::{Blob, MockTimestamps};

/// One Postgres protocol message.
///
/// Startup-phase messages have no identifier byte; the single-byte reply to
/// an SSL or GSS request has neither identifier-length framing nor payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresPacket {
    /// Message type byte as a one-character string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<char>,
    /// Human-readable message name.
    pub message_type: String,
    /// Length field as written on the wire (includes itself).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Message body after the length field.
    #[serde(default, skip_serializing_if = "Blob::is_empty")]
    pub payload: Blob,
}

/// Returns the name of a typed message for the given direction.
#[must_use]
pub fn message_name(origin: Origin, identifier: u8) -> &'static str {
    match (origin, identifier) {
        (Origin::Client, b'B') => "Bind",
        (Origin::Client, b'C') => "Close",
        (Origin::Client, b'd') | (Origin::Server, b'd') => "CopyData",
        (Origin::Client, b'c') | (Origin::Server, b'c') => "CopyDone",
        (Origin::Client, b'f') => "CopyFail",
        (Origin::Client, b'D') => "Describe",
        (Origin::Client, b'E') => "Execute",
        (Origin::Client, b'H') => "Flush",
        (Origin::Client, b'F') => "FunctionCall",
        (Origin::Client, b'P') => "Parse",
        (Origin::Client, b'p') => "PasswordMessage",
        (Origin::Client, b'Q') => "Query",
        (Origin::Client, b'S') => "Sync",
        (Origin::Client, b'X') => "Terminate",
        (Origin::Server, b'R') => "Authentication",
        (Origin::Server, b'K') => "BackendKeyData",
        (Origin::Server, b'2') => "BindComplete",
        (Origin::Server, b'3') => "CloseComplete",
        (Origin::Server, b'C') => "CommandComplete",
        (Origin::Server, b'G') => "CopyInResponse",
        (Origin::Server, b'H') => "CopyOutResponse",
        (Origin::Server, b'W') => "CopyBothResponse",
        (Origin::Server, b'D') => "DataRow",
        (Origin::Server, b'I') => "EmptyQueryResponse",
        (Origin::Server, b'E') => "ErrorResponse",
        (Origin::Server, b'V') => "FunctionCallResponse",
        (Origin::Server, b'n') => "NoData",
        (Origin::Server, b'N') => "NoticeResponse",
        (Origin::Server, b'A') => "NotificationResponse",
        (Origin::Server, b't') => "ParameterDescription",
        (Origin::Server, b'S') => "ParameterStatus",
        (Origin::Server, b'1') => "ParseComplete",
        (Origin::Server, b's') => "PortalSuspended",
        (Origin::Server, b'Z') => "ReadyForQuery",
        (Origin::Server, b'T') => "RowDescription",
        _ => "Unknown",
    }
}

/// Spec of a Postgres mock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostgresSpec {
    /// Free-form labels.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Frontend messages.
    #[serde(default)]
    pub requests: Vec<PostgresPacket>,
    /// Backend messages.
    #[serde(default)]
    pub responses: Vec<PostgresPacket>,
    /// Unix seconds at record time.
    #[serde(default)]
    pub created: i64,
    /// Interaction timestamps.
    #[serde(flatten)]
    pub timestamps: MockTimestamps,
}
