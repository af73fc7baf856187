//! Error types for the reference server.

use subledger_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors returned to clients as non-success statuses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Malformed or invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or wrong credentials.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No such resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Method not supported on this path.
    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed {
        /// Method used.
        method: String,
        /// Path requested.
        path: String,
    },

    /// The proposed version is not the stored version plus one.
    #[error("version conflict: expected {expected}, got {actual}")]
    VersionConflict {
        /// Version the server would accept.
        expected: u64,
        /// Version the client proposed.
        actual: u64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::AuthenticationFailed(_) => 401,
            ServerError::NotFound(_) => 404,
            ServerError::MethodNotAllowed { .. } => 405,
            ServerError::VersionConflict { .. } => 409,
            ServerError::Internal(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MissingAncestor { .. } => ServerError::NotFound(err.to_string()),
            other => ServerError::InvalidRequest(other.to_string()),
        }
    }
}
