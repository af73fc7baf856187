//! Configuration for the client.

use std::env;
use std::fmt;
use std::time::Duration;
use subledger_protocol::ApiKey;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.subledger.com/v1";

/// Environment variable overriding the API root.
pub const ENV_API_URL: &str = "SUBLEDGER_API_URL";
/// Environment variable holding the key id.
pub const ENV_KEY_ID: &str = "SUBLEDGER_KEY_ID";
/// Environment variable holding the key secret.
pub const ENV_SECRET: &str = "SUBLEDGER_SECRET";

/// Basic-auth credentials: an API key id and its secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Key id.
    pub key_id: String,
    /// Key secret.
    pub secret: String,
}

impl Credentials {
    /// Creates credentials from a key id and secret.
    pub fn new(key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret: secret.into(),
        }
    }
}

impl From<ApiKey> for Credentials {
    fn from(key: ApiKey) -> Self {
        Self::new(key.id, key.secret)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for talking to the API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, including the version segment.
    pub base_url: String,
    /// Credentials sent with every request, if any.
    pub credentials: Option<Credentials>,
    /// Request timeout, enforced by the HTTP client.
    pub timeout: Duration,
    /// User agent sent by the HTTP client.
    pub user_agent: String,
    /// Page size used by listings that do not set one.
    pub default_limit: Option<u32>,
}

impl ClientConfig {
    /// Creates a configuration for the given API root.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: None,
            timeout: Duration::from_secs(30),
            user_agent: concat!("subledger-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            default_limit: None,
        }
    }

    /// Builds a configuration from `SUBLEDGER_*` environment variables.
    ///
    /// Credentials are only set when both the key id and the secret are present.
    pub fn from_env() -> Self {
        let base_url = env::var(ENV_API_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);
        if let (Ok(key_id), Ok(secret)) = (env::var(ENV_KEY_ID), env::var(ENV_SECRET)) {
            config = config.with_credentials(Credentials::new(key_id, secret));
        }
        config
    }

    /// Sets the credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the default listing page size.
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = Some(limit);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
