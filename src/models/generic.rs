//! Opaque payload models used for protocols without a dedicated decoder.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::MockTimestamps;
use crate::codec::{compress_payload, decompress_payload, DecodeError};

/// Which side of the connection produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The application under test.
    Client,
    /// The dependency.
    Server,
}

/// Encoding of an [`OutputBinary`] chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryType {
    /// UTF-8 text stored verbatim.
    #[serde(rename = "utf-8")]
    Utf8,
    /// Base64 of the raw bytes.
    #[serde(rename = "binary")]
    Binary,
    /// Base64 of the gzip-compressed bytes.
    #[serde(rename = "gzip")]
    Gzip,
}

/// One captured chunk of bytes in textual form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputBinary {
    /// Encoding of `data`.
    #[serde(rename = "type")]
    pub kind: BinaryType,
    /// Encoded bytes.
    pub data: String,
}

impl OutputBinary {
    /// Encodes `bytes`, keeping UTF-8 as text and compressing other data
    /// when `compress` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if gzip compression fails.
    pub fn from_bytes(bytes: &[u8], compress: bool) -> std::io::Result<Self> {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return Ok(Self { kind: BinaryType::Utf8, data: text.to_string() });
        }
        if compress {
            Ok(Self { kind: BinaryType::Gzip, data: compress_payload(bytes)? })
        } else {
            Ok(Self { kind: BinaryType::Binary, data: STANDARD.encode(bytes) })
        }
    }

    /// Recovers the original bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data does not decode under its declared type.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        match self.kind {
            BinaryType::Utf8 => Ok(self.data.as_bytes().to_vec()),
            BinaryType::Binary => {
                STANDARD.decode(&self.data).map_err(|e| DecodeError::invalid("binary chunk", e))
            }
            BinaryType::Gzip => decompress_payload(&self.data),
        }
    }
}

/// An origin-tagged sequence of chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Producer of the chunks.
    pub origin: Origin,
    /// Chunks in arrival order.
    pub message: Vec<OutputBinary>,
}

impl Payload {
    /// Concatenates the decoded chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if any chunk fails to decode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        let mut out = Vec::new();
        for chunk in &self.message {
            out.extend(chunk.to_bytes()?);
        }
        Ok(out)
    }
}

/// Spec of a generic (or Redis) mock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericSpec {
    /// Free-form labels; `type: config` marks reusable setup traffic.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Client payloads.
    #[serde(default)]
    pub requests: Vec<Payload>,
    /// Server payloads.
    #[serde(default)]
    pub responses: Vec<Payload>,
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
    use proptest::prelude::*;

    #[test]
    fn text_chunks_are_stored_verbatim() {
        let chunk = OutputBinary::from_bytes(b"PING\r\n", true).unwrap();
        assert_eq!(chunk.kind, BinaryType::Utf8);
        assert_eq!(chunk.data, "PING\r\n");
    }

    #[test]
    fn origin_persists_lowercase() {
        let payload = Payload { origin: Origin::Server, message: vec![] };
        let yaml = serde_yaml::to_string(&payload).unwrap();
        assert!(yaml.contains("origin: server"));
    }

    proptest! {
        #[test]
        fn chunks_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..300), compress in any::<bool>()) {
            let chunk = OutputBinary::from_bytes(&bytes, compress).unwrap();
            prop_assert_eq!(chunk.to_bytes().unwrap(), bytes);
        }
    }
}
