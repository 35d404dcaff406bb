//! Crate-level error type.
//!
//! Codec failures carry the field that could not be decoded; the document
//! layer wraps them with the mock or test-case name so that every error
//! surfaced to a caller says which document and which sub-field failed.

use crate::codec::DecodeError;
use crate::matcher::MatchError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the mock engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or truncated wire bytes.
    #[error("failed to decode {context}: {source}")]
    Decode {
        /// Document name and sub-field being decoded.
        context: String,
        /// Underlying codec failure.
        #[source]
        source: DecodeError,
    },

    /// A document's `spec` does not decode under its declared kind.
    #[error("mock `{name}` of kind `{kind}` has an invalid spec: {reason}")]
    KindMismatch {
        /// Mock or test-case name.
        name: String,
        /// Declared kind.
        kind: String,
        /// What went wrong.
        reason: String,
    },

    /// A document declares a kind this crate does not understand.
    #[error("document `{name}` has unsupported kind `{kind}`")]
    UnknownKind {
        /// Mock or test-case name.
        name: String,
        /// Declared kind.
        kind: String,
    },

    /// YAML (de)serialization failure.
    #[error("yaml error in {context}: {source}")]
    Yaml {
        /// Where the failure happened.
        context: String,
        /// Underlying error.
        #[source]
        source: serde_yaml::Error,
    },

    /// JSON (de)serialization failure.
    #[error("json error in {context}: {source}")]
    Json {
        /// Where the failure happened.
        context: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Local I/O failure outside the persistence gateway.
    #[error("i/o error in {context}: {source}")]
    Io {
        /// Where the failure happened.
        context: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Persistence gateway failure.
    #[error("store error at {path}: {message}")]
    Store {
        /// Path (directory and document name) involved.
        path: String,
        /// Reason reported by the gateway.
        message: String,
    },

    /// Missing or invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Matching could not be performed.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Wraps a codec error with the document/field it belongs to.
    pub fn decode(context: impl Into<String>, source: DecodeError) -> Self {
        Self::Decode { context: context.into(), source }
    }

    /// Wraps a YAML error with context.
    pub fn yaml(context: impl Into<String>, source: serde_yaml::Error) -> Self {
        Self::Yaml { context: context.into(), source }
    }

    /// Wraps a JSON error with context.
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json { context: context.into(), source }
    }

    /// Wraps an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Builds a store error.
    pub fn store(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Store { path: path.into(), message: message.to_string() }
    }

    /// Returns `true` for errors caused by bad recorded data rather than a
    /// content mismatch. Replay reports these as setup failures.
    #[must_use]
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. }
                | Self::KindMismatch { .. }
                | Self::UnknownKind { .. }
                | Self::Yaml { .. }
                | Self::Json { .. }
                | Self::Io { .. }
                | Self::Store { .. }
                | Self::Config(_)
        )
    }
}
