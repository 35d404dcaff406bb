//! The kind-tagged [`Mock`] entity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::generic::GenericSpec;
use super::grpc::GrpcSpec;
use super::http::HttpSpec;
use super::mongo::MongoSpec;
use super::mysql::MySqlSpec;
use super::postgres::PostgresSpec;
use super::{Kind, MockTimestamps, Version};

/// Metadata key marking a connection-setup mock.
pub const METADATA_TYPE: &str = "type";

/// Metadata value of [`METADATA_TYPE`] for setup mocks that stay reusable.
pub const CONFIG_MOCK: &str = "config";

/// Protocol payload of a mock. The variant is the kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MockSpec {
    /// `Http`
    Http(HttpSpec),
    /// `Generic`
    Generic(GenericSpec),
    /// `SQL`
    MySql(MySqlSpec),
    /// `Mongo`
    Mongo(MongoSpec),
    /// `Postgres`
    Postgres(PostgresSpec),
    /// `gRPC`
    Grpc(GrpcSpec),
    /// `Redis`
    Redis(GenericSpec),
}

impl MockSpec {
    /// The discriminator persisted next to this payload.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Http(_) => Kind::Http,
            Self::Generic(_) => Kind::Generic,
            Self::MySql(_) => Kind::Sql,
            Self::Mongo(_) => Kind::Mongo,
            Self::Postgres(_) => Kind::Postgres,
            Self::Grpc(_) => Kind::Grpc,
            Self::Redis(_) => Kind::Redis,
        }
    }

    /// Interaction timestamps.
    #[must_use]
    pub fn timestamps(&self) -> &MockTimestamps {
        match self {
            Self::Http(s) => &s.timestamps,
            Self::Generic(s) | Self::Redis(s) => &s.timestamps,
            Self::MySql(s) => &s.timestamps,
            Self::Mongo(s) => &s.timestamps,
            Self::Postgres(s) => &s.timestamps,
            Self::Grpc(s) => &s.timestamps,
        }
    }

    /// Mutable interaction timestamps.
    pub fn timestamps_mut(&mut self) -> &mut MockTimestamps {
        match self {
            Self::Http(s) => &mut s.timestamps,
            Self::Generic(s) | Self::Redis(s) => &mut s.timestamps,
            Self::MySql(s) => &mut s.timestamps,
            Self::Mongo(s) => &mut s.timestamps,
            Self::Postgres(s) => &mut s.timestamps,
            Self::Grpc(s) => &mut s.timestamps,
        }
    }

    /// Metadata labels; gRPC mocks carry none.
    #[must_use]
    pub fn metadata(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Http(s) => Some(&s.metadata),
            Self::Generic(s) | Self::Redis(s) => Some(&s.metadata),
            Self::MySql(s) => Some(&s.metadata),
            Self::Mongo(s) => Some(&s.metadata),
            Self::Postgres(s) => Some(&s.metadata),
            Self::Grpc(_) => None,
        }
    }
}

/// Replay bookkeeping attached to a mock while it sits in a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestModeInfo {
    /// Chosen from the filtered partition of the selector.
    pub is_filtered: bool,
    /// Position in the selector output.
    pub sort_order: i64,
}

/// A recorded dependency interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Mock {
    /// Schema version.
    pub version: Version,
    /// Unique name within its test set.
    pub name: String,
    /// Connection the traffic was observed on.
    pub connection_id: String,
    /// Protocol payload.
    pub spec: MockSpec,
    /// Replay bookkeeping; never persisted.
    pub test_mode_info: TestModeInfo,
}

impl Mock {
    /// Builds a mock at the current schema version.
    #[must_use]
    pub fn new(name: impl Into<String>, spec: MockSpec) -> Self {
        Self {
            version: Version::CURRENT,
            name: name.into(),
            connection_id: String::new(),
            spec,
            test_mode_info: TestModeInfo::default(),
        }
    }

    /// Builds an HTTP mock.
    #[must_use]
    pub fn http(name: impl Into<String>, spec: HttpSpec) -> Self {
        Self::new(name, MockSpec::Http(spec))
    }

    /// Builds a generic mock.
    #[must_use]
    pub fn generic(name: impl Into<String>, spec: GenericSpec) -> Self {
        Self::new(name, MockSpec::Generic(spec))
    }

    /// Builds a MySQL mock.
    #[must_use]
    pub fn mysql(name: impl Into<String>, spec: MySqlSpec) -> Self {
        Self::new(name, MockSpec::MySql(spec))
    }

    /// Builds a MongoDB mock.
    #[must_use]
    pub fn mongo(name: impl Into<String>, spec: MongoSpec) -> Self {
        Self::new(name, MockSpec::Mongo(spec))
    }

    /// Builds a Postgres mock.
    #[must_use]
    pub fn postgres(name: impl Into<String>, spec: PostgresSpec) -> Self {
        Self::new(name, MockSpec::Postgres(spec))
    }

    /// Builds a gRPC mock.
    #[must_use]
    pub fn grpc(name: impl Into<String>, spec: GrpcSpec) -> Self {
        Self::new(name, MockSpec::Grpc(spec))
    }

    /// Builds a Redis mock.
    #[must_use]
    pub fn redis(name: impl Into<String>, spec: GenericSpec) -> Self {
        Self::new(name, MockSpec::Redis(spec))
    }

    /// Sets the connection id.
    #[must_use]
    pub fn with_connection_id(mut self, id: impl Into<String>) -> Self {
        self.connection_id = id.into();
        self
    }

    /// Protocol discriminator.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.spec.kind()
    }

    /// Request timestamp, if recorded.
    #[must_use]
    pub fn req_timestamp(&self) -> Option<DateTime<Utc>> {
        self.spec.timestamps().req_timestamp_mock
    }

    /// Response timestamp, if recorded.
    #[must_use]
    pub fn res_timestamp(&self) -> Option<DateTime<Utc>> {
        self.spec.timestamps().res_timestamp_mock
    }

    /// `true` for connection-setup mocks that may be reused during replay.
    #[must_use]
    pub fn is_config(&self) -> bool {
        self.spec
            .metadata()
            .and_then(|m| m.get(METADATA_TYPE))
            .is_some_and(|t| t == CONFIG_MOCK)
    }
}
