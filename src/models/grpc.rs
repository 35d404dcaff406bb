//! gRPC models: HTTP/2 header blocks and length-prefixed messages.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::http::BodyType;
use super::MockTimestamps;
use crate::codec::{decode_body, encode_body, DecodeError};

/// Header block split into `:pseudo` and ordinary headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrpcHeaders {
    /// `:method`, `:path`, `:status` and friends.
    #[serde(default)]
    pub pseudo_headers: IndexMap<String, String>,
    /// Everything else.
    #[serde(default)]
    pub ordinary_headers: IndexMap<String, String>,
}

/// One gRPC message frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthPrefixedMessage {
    /// 0 for uncompressed, 1 for compressed.
    pub compression_flag: u8,
    /// Payload length as written on the wire.
    pub message_length: u32,
    /// Payload text (see `data_type`).
    pub decoded_data: String,
    /// Payload encoding.
    #[serde(default)]
    pub data_type: BodyType,
}

impl LengthPrefixedMessage {
    /// Builds a frame for `payload`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is longer than the 4-byte length
    /// prefix can express.
    pub fn new(compression_flag: u8, payload: &[u8]) -> Result<Self, DecodeError> {
        let message_length = u32::try_from(payload.len())
            .map_err(|_| DecodeError::invalid("message length", "payload exceeds 4 GiB"))?;
        let (decoded_data, data_type) = encode_body(payload);
        Ok(Self { compression_flag, message_length, decoded_data, data_type })
    }

    /// Returns the raw payload.
    ///
    /// # Errors
    ///
    /// Returns an error if a binary payload is not valid base64.
    pub fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        decode_body(&self.decoded_data, self.data_type)
    }
}

/// A recorded gRPC request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrpcReq {
    /// Request headers.
    pub headers: GrpcHeaders,
    /// Request messages.
    #[serde(default)]
    pub body: Vec<LengthPrefixedMessage>,
}

/// A recorded gRPC response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrpcResp {
    /// Response headers.
    pub headers: GrpcHeaders,
    /// Response messages.
    #[serde(default)]
    pub body: Vec<LengthPrefixedMessage>,
    /// Trailing headers (`grpc-status`, `grpc-message`).
    #[serde(default)]
    pub trailers: GrpcHeaders,
}

/// Spec of a gRPC mock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrpcSpec {
    /// Outgoing request.
    #[serde(rename = "grpcReq")]
    pub grpc_req: GrpcReq,
    /// Response returned to the application.
    #[serde(rename = "grpcResp")]
    pub grpc_resp: GrpcResp,
    /// Interaction timestamps.
    #[serde(flatten)]
    pub timestamps: MockTimestamps,
}
