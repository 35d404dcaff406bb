//! Schema version and protocol discriminators for persisted documents.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Schema version tag carried by every persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Version {
    /// `api.keploy.io/v1beta1`
    V1Beta1,
    /// `api.keploy.io/v1beta2`
    V1Beta2,
    /// Any other tag; decoded but treated as foreign.
    Other(String),
}

impl Version {
    /// The version written by this crate.
    pub const CURRENT: Self = Self::V1Beta1;

    /// Returns the persisted string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::V1Beta1 => "api.keploy.io/v1beta1",
            Self::V1Beta2 => "api.keploy.io/v1beta2",
            Self::Other(s) => s,
        }
    }

    /// `true` for the tags this crate knows how to decode.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        match s.as_str() {
            "api.keploy.io/v1beta1" => Self::V1Beta1,
            "api.keploy.io/v1beta2" => Self::V1Beta2,
            _ => Self::Other(s),
        }
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.as_str().to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol discriminator of a mock or test case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Kind {
    /// HTTP/1.x exchanges.
    Http,
    /// Opaque binary capture.
    Generic,
    /// MySQL wire protocol.
    Sql,
    /// MongoDB wire protocol.
    Mongo,
    /// Postgres wire protocol.
    Postgres,
    /// gRPC over HTTP/2.
    Grpc,
    /// Redis (RESP) captured as opaque payloads.
    Redis,
    /// A kind this crate does not understand.
    Unknown(String),
}

impl Kind {
    /// Returns the persisted string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Http => "Http",
            Self::Generic => "Generic",
            Self::Sql => "SQL",
            Self::Mongo => "Mongo",
            Self::Postgres => "Postgres",
            Self::Grpc => "gRPC",
            Self::Redis => "Redis",
            Self::Unknown(s) => s,
        }
    }
}

impl Default for Kind {
    fn default() -> Self {
        Self::Http
    }
}

impl From<String> for Kind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Http" => Self::Http,
            "Generic" => Self::Generic,
            "SQL" => Self::Sql,
            "Mongo" => Self::Mongo,
            "Postgres" => Self::Postgres,
            "gRPC" => Self::Grpc,
            "Redis" => Self::Redis,
            _ => Self::Unknown(s),
        }
    }
}

impl From<Kind> for String {
    fn from(k: Kind) -> Self {
        k.as_str().to_string()
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
