//! Error types for protocol decoding and address resolution.

use crate::kind::EntityKind;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building paths or decoding server payloads.
///
/// Every variant is either a programmer error (a path could not be built) or
/// a protocol violation by the server. None of them is worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A required ancestor id was absent or empty.
    #[error("missing {ancestor} id for {kind} path")]
    MissingAncestor {
        /// Kind whose path was being built.
        kind: EntityKind,
        /// Name of the missing ancestor ("org" or "book").
        ancestor: &'static str,
    },

    /// The server reported a state tag outside the kind's tag set.
    #[error("state tag `{tag}` is not one of {kind} tags {expected:?}")]
    UnknownStateTag {
        /// Kind the tag was validated against.
        kind: EntityKind,
        /// Tag returned by the server.
        tag: String,
        /// The kind's declared tag set.
        expected: [&'static str; 2],
    },

    /// A single-entity response was not a one-key object.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A required field was missing from a payload.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A field was present but had the wrong shape.
    #[error("invalid field `{field}`: {message}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// An amount was not a non-negative decimal string.
    #[error("invalid amount `{0}`")]
    InvalidAmount(String),
}

impl ProtocolError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }

    /// Returns true if the error was caused by the server's response rather
    /// than by the caller.
    pub fn is_server_violation(&self) -> bool {
        !matches!(
            self,
            ProtocolError::MissingAncestor { .. } | ProtocolError::InvalidAmount(_)
        )
    }
}
