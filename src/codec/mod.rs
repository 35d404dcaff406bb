//! Conversion between raw wire bytes and the typed packet models.
//!
//! Every decoder reads its discriminator (opcode, command byte, frame flag)
//! from the stream itself and returns a concrete model or a [`DecodeError`]
//! naming the field that could not be read.

pub mod grpc;
pub mod mongo;
pub mod mysql;
pub mod payload;
pub mod postgres;
pub mod reader;

pub use payload::{compress_payload, decode_body, decompress_payload, encode_body};
pub use reader::Reader;

/// A wire-level decode failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Fewer bytes were available than the field requires.
    #[error("truncated {field}: need {needed} bytes, have {available}")]
    Short {
        /// Field being read.
        field: String,
        /// Bytes required.
        needed: usize,
        /// Bytes remaining.
        available: usize,
    },

    /// The bytes were present but invalid for the field.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Field being read.
        field: String,
        /// Why it is invalid.
        reason: String,
    },
}

impl DecodeError {
    /// Builds a truncation error.
    pub fn short(field: impl Into<String>, needed: usize, available: usize) -> Self {
        Self::Short { field: field.into(), needed, available }
    }

    /// Builds an invalid-value error.
    pub fn invalid(field: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Invalid { field: field.into(), reason: reason.to_string() }
    }
}
