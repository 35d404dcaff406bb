//! Typed models for recorded traffic.
//!
//! Protocol packets live in one module per protocol; [`mock::Mock`] and
//! [`testcase::TestCase`] wrap them into the persisted, kind-tagged form.

pub mod blob;
pub mod generic;
pub mod grpc;
pub mod http;
pub mod kind;
pub mod mock;
pub mod mongo;
pub mod mysql;
pub mod postgres;
pub mod testcase;
pub mod testrun;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use blob::Blob;
pub use kind::{Kind, Version};
pub use mock::{Mock, MockSpec, TestModeInfo};
pub use testcase::{Noise, TestCase};

/// Request/response timestamps of a recorded interaction.
///
/// A mock missing either value is a legacy recording and is never excluded
/// by the temporal selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockTimestamps {
    /// When the dependency received the request.
    #[serde(rename = "reqTimestampMock", default, skip_serializing_if = "Option::is_none")]
    pub req_timestamp_mock: Option<DateTime<Utc>>,
    /// When the dependency's response completed.
    #[serde(rename = "resTimestampMock", default, skip_serializing_if = "Option::is_none")]
    pub res_timestamp_mock: Option<DateTime<Utc>>,
}

impl MockTimestamps {
    /// Builds a complete pair.
    #[must_use]
    pub fn new(req: DateTime<Utc>, res: DateTime<Utc>) -> Self {
        Self { req_timestamp_mock: Some(req), res_timestamp_mock: Some(res) }
    }

    /// Returns both timestamps when present.
    #[must_use]
    pub fn pair(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.req_timestamp_mock.zip(self.res_timestamp_mock)
    }
}
