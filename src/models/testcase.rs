//! The [`TestCase`] entity: an inbound call plus the mocks it relied on.

use std::collections::BTreeMap;

use super::grpc::{GrpcReq, GrpcResp};
use super::http::{HttpReq, HttpResp};
use super::{Kind, Version};

/// Dotted field path mapped to regex hints.
///
/// An empty hint list ignores the field entirely; otherwise the field is
/// ignored only when its value matches one of the hints.
pub type Noise = BTreeMap<String, Vec<String>>;

/// A recorded inbound call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestCase {
    /// Schema version.
    pub version: Version,
    /// `Http` or `gRPC`.
    pub kind: Kind,
    /// Unique name within its test set.
    pub name: String,
    /// Unix seconds at record time.
    pub created: i64,
    /// Inbound HTTP request.
    pub http_req: HttpReq,
    /// Response the application produced.
    pub http_resp: HttpResp,
    /// Inbound gRPC request.
    pub grpc_req: Option<GrpcReq>,
    /// gRPC response the application produced.
    pub grpc_resp: Option<GrpcResp>,
    /// Names of the mocks this call depended on.
    pub mocks: Vec<String>,
    /// Fields excluded from comparison.
    pub noise: Noise,
    /// Every flattened response key with its values.
    pub all_keys: BTreeMap<String, Vec<String>>,
    /// Selected keys used for lookup and bulk deletion.
    pub anchors: BTreeMap<String, Vec<String>>,
    /// Equivalent curl command, informational only.
    pub curl: Option<String>,
}

impl TestCase {
    /// Builds an HTTP test case with no noise.
    #[must_use]
    pub fn from_http(name: impl Into<String>, req: HttpReq, resp: HttpResp, created: i64) -> Self {
        Self {
            version: Version::CURRENT,
            kind: Kind::Http,
            name: name.into(),
            created,
            http_req: req,
            http_resp: resp,
            ..Self::default()
        }
    }

    /// Builds a gRPC test case with no noise.
    #[must_use]
    pub fn from_grpc(name: impl Into<String>, req: GrpcReq, resp: GrpcResp, created: i64) -> Self {
        Self {
            version: Version::CURRENT,
            kind: Kind::Grpc,
            name: name.into(),
            created,
            grpc_req: Some(req),
            grpc_resp: Some(resp),
            ..Self::default()
        }
    }

    /// `true` when every key/value pair of `filter` appears in the anchors.
    #[must_use]
    pub fn anchors_match(&self, filter: &BTreeMap<String, Vec<String>>) -> bool {
        filter.iter().all(|(key, wanted)| {
            self.anchors.get(key).is_some_and(|have| wanted.iter().all(|v| have.contains(v)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_filter_requires_every_pair() {
        let mut tc = TestCase::from_http("test-1", HttpReq::default(), HttpResp::default(), 0);
        tc.anchors.insert("header.X-User".into(), vec!["alice".into(), "bob".into()]);
        tc.anchors.insert("body.region".into(), vec!["eu".into()]);

        let mut filter = BTreeMap::new();
        filter.insert("header.X-User".into(), vec!["alice".into()]);
        assert!(tc.anchors_match(&filter));

        filter.insert("body.region".into(), vec!["us".into()]);
        assert!(!tc.anchors_match(&filter));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let tc = TestCase::default();
        assert!(tc.anchors_match(&BTreeMap::new()));
    }
}
