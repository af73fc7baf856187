//! Error types for the client.

use subledger_protocol::{EntityKind, ProtocolError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while synchronizing entities.
///
/// Nothing here is retried by the client. Only the caller knows whether
/// repeating a write is safe: a create may be, a versioned update built on a
/// stale version is not.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("remote error {status}: {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Path building or payload decoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A cached entity has a different kind than the one requested.
    #[error("id {id} is cached as {found}, not {expected}")]
    KindMismatch {
        /// The id that was looked up.
        id: String,
        /// Kind the caller asked for.
        expected: EntityKind,
        /// Kind found in the cache.
        found: EntityKind,
    },

    /// A lifecycle action returned a tag other than its target tag.
    #[error("expected state tag `{expected}`, server returned `{found}`")]
    UnexpectedStateTag {
        /// Tag the transition should produce.
        expected: &'static str,
        /// Tag the server returned.
        found: String,
    },

    /// A lifecycle action was attempted on an entity that was never saved.
    #[error("{kind} has not been saved yet")]
    NotPersisted {
        /// Kind of the unsaved entity.
        kind: EntityKind,
    },

    /// The server returned an entity with a different id than requested.
    #[error("requested id {requested}, server returned {returned}")]
    IdentityMismatch {
        /// Id used for the lookup.
        requested: String,
        /// Id found in the response.
        returned: String,
    },

    /// JSON encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),
}

impl ClientError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the request can be repeated as-is.
    ///
    /// Only connection-level failures qualify. A rejected request is never
    /// reported as retryable, since resubmitting a versioned update without
    /// refetching would resend a stale version.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport { retryable: true, .. })
    }

    /// Returns true if the server broke the protocol contract.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            ClientError::Protocol(err) => err.is_server_violation(),
            ClientError::UnexpectedStateTag { .. } | ClientError::IdentityMismatch { .. } => true,
            _ => false,
        }
    }

    /// HTTP status of a remote error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Codec(err.to_string())
    }
}
