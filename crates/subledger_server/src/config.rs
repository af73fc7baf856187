//! Server configuration.

/// Configuration for the reference server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Largest page a listing returns, whatever the requested limit.
    pub max_list_limit: u32,
    /// Whether requests must carry valid Basic credentials.
    pub require_auth: bool,
    /// Key id and secret pairs accepted in addition to issued keys.
    pub api_keys: Vec<(String, String)>,
}

impl ServerConfig {
    /// Creates a configuration with authentication disabled.
    pub fn new() -> Self {
        Self {
            max_list_limit: 100,
            require_auth: false,
            api_keys: Vec::new(),
        }
    }

    /// Sets the largest page size.
    pub fn with_max_list_limit(mut self, limit: u32) -> Self {
        self.max_list_limit = limit;
        self
    }

    /// Enables authentication and accepts the given key.
    pub fn with_auth(mut self, key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.require_auth = true;
        self.api_keys.push((key_id.into(), secret.into()));
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
