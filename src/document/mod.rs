//! Persisted document form of mocks and test cases.
//!
//! Every document is an envelope `{version, kind, name, spec, curl?,
//! connectionId?}`. The `spec` stays an untyped YAML value until `kind` is
//! known, then decodes into the matching protocol spec.

pub mod curl;
pub mod stream;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::grpc::{GrpcReq, GrpcResp};
use crate::models::http::{HttpReq, HttpResp};
use crate::models::{Kind, Mock, MockSpec, Noise, TestCase, TestModeInfo, Version};

/// Assertion key holding noise.
pub const NOISE_KEY: &str = "noise";

/// Envelope shared by mocks and test cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkTrafficDoc {
    /// Schema version.
    pub version: Version,
    /// Protocol discriminator.
    pub kind: Kind,
    /// Document name.
    pub name: String,
    /// Protocol payload, decoded according to `kind`.
    pub spec: serde_yaml::Value,
    /// Equivalent curl command, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curl: Option<String>,
    /// Connection the traffic was observed on.
    #[serde(rename = "connectionId", default, skip_serializing_if = "String::is_empty")]
    pub connection_id: String,
}

fn to_spec<T: Serialize>(name: &str, kind: &Kind, spec: &T) -> Result<serde_yaml::Value> {
    serde_yaml::to_value(spec).map_err(|e| Error::KindMismatch {
        name: name.to_string(),
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

fn from_spec<T: DeserializeOwned>(doc: NetworkTrafficDoc) -> Result<T> {
    serde_yaml::from_value(doc.spec).map_err(|e| Error::KindMismatch {
        name: doc.name,
        kind: doc.kind.to_string(),
        reason: e.to_string(),
    })
}

/// Wraps a mock into its envelope.
///
/// # Errors
///
/// Returns an error if the mock payload cannot be represented as YAML.
pub fn encode_mock(mock: &Mock) -> Result<NetworkTrafficDoc> {
    let kind = mock.kind();
    let spec = match &mock.spec {
        MockSpec::Http(s) => to_spec(&mock.name, &kind, s)?,
        MockSpec::Generic(s) | MockSpec::Redis(s) => to_spec(&mock.name, &kind, s)?,
        MockSpec::MySql(s) => to_spec(&mock.name, &kind, s)?,
        MockSpec::Mongo(s) => to_spec(&mock.name, &kind, s)?,
        MockSpec::Postgres(s) => to_spec(&mock.name, &kind, s)?,
        MockSpec::Grpc(s) => to_spec(&mock.name, &kind, s)?,
    };
    Ok(NetworkTrafficDoc {
        version: mock.version.clone(),
        kind,
        name: mock.name.clone(),
        spec,
        curl: None,
        connection_id: mock.connection_id.clone(),
    })
}

/// Decodes an envelope into a mock.
///
/// # Errors
///
/// Returns [`Error::UnknownKind`] for unsupported kinds and
/// [`Error::KindMismatch`] when `spec` does not fit the declared kind.
pub fn decode_mock(doc: NetworkTrafficDoc) -> Result<Mock> {
    let version = doc.version.clone();
    let name = doc.name.clone();
    let connection_id = doc.connection_id.clone();
    let spec = match doc.kind.clone() {
        Kind::Http => MockSpec::Http(from_spec(doc)?),
        Kind::Generic => MockSpec::Generic(from_spec(doc)?),
        Kind::Redis => MockSpec::Redis(from_spec(doc)?),
        Kind::Sql => MockSpec::MySql(from_spec(doc)?),
        Kind::Mongo => MockSpec::Mongo(from_spec(doc)?),
        Kind::Postgres => MockSpec::Postgres(from_spec(doc)?),
        Kind::Grpc => MockSpec::Grpc(from_spec(doc)?),
        Kind::Unknown(kind) => return Err(Error::UnknownKind { name, kind }),
    };
    Ok(Mock { version, name, connection_id, spec, test_mode_info: TestModeInfo::default() })
}

/// Decodes a collection of envelopes, skipping kinds this crate does not
/// understand. Kinds containing `-` are extensions and are skipped
/// quietly.
///
/// # Errors
///
/// Returns the first [`Error::KindMismatch`] among known kinds.
pub fn decode_mocks(docs: Vec<NetworkTrafficDoc>) -> Result<Vec<Mock>> {
    let mut mocks = Vec::with_capacity(docs.len());
    for doc in docs {
        if let Kind::Unknown(kind) = &doc.kind {
            if kind.contains('-') {
                debug!(mock = %doc.name, kind = %kind, "skipping extension mock kind");
            } else {
                warn!(mock = %doc.name, kind = %kind, "skipping mock of unsupported kind");
            }
            continue;
        }
        mocks.push(decode_mock(doc)?);
    }
    Ok(mocks)
}

/// Assertions block of a persisted test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assertions {
    /// Fields excluded from comparison.
    #[serde(default)]
    pub noise: Noise,
}

/// Persisted `spec` of an HTTP or gRPC test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCaseSpec {
    /// Free-form labels.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Inbound HTTP request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req: Option<HttpReq>,
    /// Recorded HTTP response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resp: Option<HttpResp>,
    /// Inbound gRPC request.
    #[serde(rename = "grpcReq", default, skip_serializing_if = "Option::is_none")]
    pub grpc_req: Option<GrpcReq>,
    /// Recorded gRPC response.
    #[serde(rename = "grpcResp", default, skip_serializing_if = "Option::is_none")]
    pub grpc_resp: Option<GrpcResp>,
    /// Noise settings.
    #[serde(default)]
    pub assertions: Assertions,
    /// Mock names the call depended on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mocks: Vec<String>,
    /// Lookup anchors.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub anchors: BTreeMap<String, Vec<String>>,
    /// Unix seconds at record time.
    #[serde(default)]
    pub created: i64,
}

/// Wraps a test case into its envelope.
///
/// # Errors
///
/// Returns an error if the test case cannot be represented as YAML.
pub fn encode_test_case(tc: &TestCase) -> Result<NetworkTrafficDoc> {
    let http = tc.kind == Kind::Http;
    let spec = TestCaseSpec {
        metadata: BTreeMap::new(),
        req: http.then(|| tc.http_req.clone()),
        resp: http.then(|| tc.http_resp.clone()),
        grpc_req: tc.grpc_req.clone(),
        grpc_resp: tc.grpc_resp.clone(),
        assertions: Assertions { noise: tc.noise.clone() },
        mocks: tc.mocks.clone(),
        anchors: tc.anchors.clone(),
        created: tc.created,
    };
    Ok(NetworkTrafficDoc {
        version: tc.version.clone(),
        kind: tc.kind.clone(),
        name: tc.name.clone(),
        spec: to_spec(&tc.name, &tc.kind, &spec)?,
        curl: tc.curl.clone(),
        connection_id: String::new(),
    })
}

/// Decodes an envelope into a test case.
///
/// # Errors
///
/// Returns [`Error::UnknownKind`] for kinds other than `Http` and `gRPC`
/// and [`Error::KindMismatch`] when the `spec` body does not fit the kind.
pub fn decode_test_case(doc: NetworkTrafficDoc) -> Result<TestCase> {
    if !matches!(doc.kind, Kind::Http | Kind::Grpc) {
        return Err(Error::UnknownKind { name: doc.name, kind: doc.kind.to_string() });
    }
    let (version, kind, name, curl) = (doc.version.clone(), doc.kind.clone(), doc.name.clone(), doc.curl.clone());
    let spec: TestCaseSpec = from_spec(doc)?;
    if kind == Kind::Http && spec.req.is_none() {
        return Err(Error::KindMismatch { name, kind: kind.to_string(), reason: "missing req".into() });
    }
    Ok(TestCase {
        version,
        kind,
        name,
        created: spec.created,
        http_req: spec.req.unwrap_or_default(),
        http_resp: spec.resp.unwrap_or_default(),
        grpc_req: spec.grpc_req,
        grpc_resp: spec.grpc_resp,
        mocks: spec.mocks,
        noise: spec.assertions.noise,
        all_keys: BTreeMap::new(),
        anchors: spec.anchors,
        curl,
    })
}
