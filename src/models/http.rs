//! HTTP request/response models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::generic::OutputBinary;
use super::MockTimestamps;
use crate::codec::{decode_body, encode_body, DecodeError};

/// How a body string is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyType {
    /// Plain UTF-8 text.
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    /// Base64 of arbitrary bytes.
    #[serde(rename = "binary")]
    Binary,
}

impl BodyType {
    fn is_utf8(&self) -> bool {
        *self == Self::Utf8
    }
}

/// One multipart form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData {
    /// Field name.
    pub key: String,
    /// Text values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    /// Uploaded file paths.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

/// A recorded HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpReq {
    /// Request method, upper-case.
    pub method: String,
    /// HTTP major version.
    pub proto_major: u32,
    /// HTTP minor version.
    pub proto_minor: u32,
    /// Full request URL.
    pub url: String,
    /// Decoded query parameters.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub url_params: IndexMap<String, String>,
    /// Headers in wire order; repeated headers are joined with `, `.
    #[serde(default)]
    pub header: IndexMap<String, String>,
    /// Body text (see `body_type`).
    #[serde(default)]
    pub body: String,
    /// Body encoding.
    #[serde(default, skip_serializing_if = "BodyType::is_utf8")]
    pub body_type: BodyType,
    /// Multipart form fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form: Vec<FormData>,
    /// When the request was observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl HttpReq {
    /// Stores `bytes` as the body, choosing text or base64.
    pub fn set_body(&mut self, bytes: &[u8]) {
        (self.body, self.body_type) = encode_body(bytes);
    }

    /// Returns the raw body bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if a binary body is not valid base64.
    pub fn body_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        decode_body(&self.body, self.body_type)
    }
}

/// A recorded HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResp {
    /// Status code.
    pub status_code: u16,
    /// Headers in wire order.
    #[serde(default)]
    pub header: IndexMap<String, String>,
    /// Body text (see `body_type`).
    #[serde(default)]
    pub body: String,
    /// Body encoding.
    #[serde(default, skip_serializing_if = "BodyType::is_utf8")]
    pub body_type: BodyType,
    /// Reason phrase.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status_message: String,
    /// HTTP major version.
    #[serde(default)]
    pub proto_major: u32,
    /// HTTP minor version.
    #[serde(default)]
    pub proto_minor: u32,
    /// When the response was observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl HttpResp {
    /// Stores `bytes` as the body, choosing text or base64.
    pub fn set_body(&mut self, bytes: &[u8]) {
        (self.body, self.body_type) = encode_body(bytes);
    }

    /// Returns the raw body bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if a binary body is not valid base64.
    pub fn body_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        decode_body(&self.body, self.body_type)
    }
}

/// Spec of an HTTP mock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpSpec {
    /// Free-form labels.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Outgoing request.
    pub req: HttpReq,
    /// Response returned to the application.
    pub resp: HttpResp,
    /// Auxiliary binary objects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<OutputBinary>,
    /// Assertion settings; `noise` lists ignored fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assertions: BTreeMap<String, Vec<String>>,
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

    #[test]
    fn binary_body_is_tagged() {
        let mut resp = HttpResp::default();
        resp.set_body(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(resp.body_type, BodyType::Binary);
        let yaml = serde_yaml::to_string(&resp).unwrap();
        assert!(yaml.contains("body_type: binary"));
        let back: HttpResp = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.body_bytes().unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn headers_keep_wire_order() {
        let mut req = HttpReq::default();
        req.header.insert("Zeta".into(), "1".into());
        req.header.insert("Alpha".into(), "2".into());
        let yaml = serde_yaml::to_string(&req).unwrap();
        assert!(yaml.find("Zeta").unwrap() < yaml.find("Alpha").unwrap());
    }
}
