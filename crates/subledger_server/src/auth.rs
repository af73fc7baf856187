//! Basic authentication.
//!
//! Requests carry `Authorization: Basic base64(key_id:secret)`. A key is
//! valid if it is configured on the server or was issued by identity
//! creation.

use crate::error::{ServerError, ServerResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Key id and secret decoded from a Basic header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Key id.
    pub key_id: String,
    /// Key secret.
    pub secret: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl BasicCredentials {
    /// Decodes an `Authorization` header value.
    pub fn parse(header: &str) -> ServerResult<Self> {
        let encoded = header
            .strip_prefix("Basic ")
            .ok_or_else(|| ServerError::AuthenticationFailed("expected Basic credentials".into()))?;
        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| ServerError::AuthenticationFailed(format!("invalid base64: {e}")))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| ServerError::AuthenticationFailed("credentials are not UTF-8".into()))?;
        let (key_id, secret) = decoded
            .split_once(':')
            .ok_or_else(|| ServerError::AuthenticationFailed("missing `:` separator".into()))?;
        Ok(Self {
            key_id: key_id.to_string(),
            secret: secret.to_string(),
        })
    }
}

/// Checks key id and secret pairs.
pub trait KeyValidator: Send + Sync {
    /// Returns true if the pair is valid.
    fn is_valid(&self, key_id: &str, secret: &str) -> bool;
}

/// Validates against a fixed list of keys.
#[derive(Debug, Clone, Default)]
pub struct StaticKeys {
    keys: Vec<(String, String)>,
}

impl StaticKeys {
    /// Creates a validator over the given pairs.
    pub fn new(keys: Vec<(String, String)>) -> Self {
        Self { keys }
    }
}

impl KeyValidator for StaticKeys {
    fn is_valid(&self, key_id: &str, secret: &str) -> bool {
        self.keys
            .iter()
            .any(|(id, s)| id == key_id && s == secret)
    }
}
