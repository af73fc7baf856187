//! HTTP transport implementation.
//!
//! [`HttpTransport`] turns transport calls into JSON-over-HTTP requests: it
//! builds URLs, encodes bodies, adds Basic authentication and maps statuses to
//! errors. The wire itself is abstracted behind [`HttpClient`] so different
//! HTTP libraries, or an in-process server, can be plugged in.

use crate::config::{ClientConfig, Credentials};
use crate::error::{ClientError, ClientResult};
use crate::transport::{Method, Transport};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

/// Statuses treated as success.
pub const SUCCESS_STATUSES: [u16; 3] = [200, 201, 202];

/// A fully built HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Encoded body.
    pub body: Option<Vec<u8>>,
}

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body bytes.
    pub body: Vec<u8>,
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual wire transport. An `Err` means
/// no response was received at all; statuses are reported through
/// [`HttpResponse`].
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// JSON-over-HTTP transport.
pub struct HttpTransport<C: HttpClient> {
    /// API root without trailing slash (e.g. "https://api.subledger.com/v1").
    base_url: String,
    /// HTTP client implementation.
    client: C,
    /// Credentials for Basic authentication.
    credentials: RwLock<Option<Credentials>>,
    /// Last transport error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport from a configuration and a client.
    pub fn new(config: &ClientConfig, client: C) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            credentials: RwLock::new(config.credentials.clone()),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the API root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replaces the credentials used for subsequent requests.
    pub fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write() = Some(credentials);
    }

    /// Returns the current key id, if authenticated.
    pub fn key_id(&self) -> Option<String> {
        self.credentials.read().as_ref().map(|c| c.key_id.clone())
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }

    fn url(&self, path: &str, query: &[(String, String)]) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(query));
        }
        url
    }

    fn headers(&self, has_body: bool) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if has_body {
            headers.push(("Content-Type".into(), "application/json".into()));
        }
        if let Some(credentials) = self.credentials.read().as_ref() {
            headers.push(("Authorization".into(), basic_auth(credentials)));
        }
        headers
    }

    fn send_json(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        let body = body.map(serde_json::to_vec).transpose()?;
        let request = HttpRequest {
            method,
            url: self.url(path, query),
            headers: self.headers(body.is_some()),
            body,
        };

        debug!(
            method = method.as_str(),
            url = %request.url,
            key_id = self.key_id().as_deref().unwrap_or("-"),
            "sending request"
        );

        let response = self.client.send(request).map_err(|e| {
            self.set_error(&e);
            ClientError::transport_retryable(e)
        })?;
        self.clear_error();

        let text = String::from_utf8_lossy(&response.body);
        if !SUCCESS_STATUSES.contains(&response.status) {
            warn!(status = response.status, path, "request rejected");
            return Err(ClientError::Remote {
                status: response.status,
                body: text.into_owned(),
            });
        }
        if response.body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&response.body)?)
    }
}

impl<C: HttpClient> Transport for HttpTransport<C> {
    fn get(&self, path: &str, query: &[(String, String)]) -> ClientResult<Value> {
        self.send_json(Method::Get, path, query, None)
    }

    fn post(&self, path: &str, body: &Value) -> ClientResult<Value> {
        self.send_json(Method::Post, path, &[], Some(body))
    }

    fn patch(&self, path: &str, body: &Value) -> ClientResult<Value> {
        self.send_json(Method::Patch, path, &[], Some(body))
    }
}

/// Builds an `Authorization` header value for Basic authentication.
pub fn basic_auth(credentials: &Credentials) -> String {
    let token = BASE64.encode(format!("{}:{}", credentials.key_id, credentials.secret));
    format!("Basic {token}")
}

/// Percent-encodes query pairs.
pub fn encode_query(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// A loopback HTTP client that routes requests directly to an in-process server.
///
/// Useful for testing the full HTTP stack without a network.
pub struct LoopbackClient<S: LoopbackServer> {
    base_url: String,
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a loopback client; `base_url` is stripped from request URLs.
    pub fn new(base_url: impl Into<String>, server: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            server,
        }
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a request; `target` is the path plus query string.
    fn handle(
        &self,
        method: Method,
        target: &str,
        headers: &[(String, String)],
        body: Option<&[u8]>,
    ) -> HttpResponse;
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let target = request
            .url
            .strip_prefix(&self.base_url)
            .ok_or_else(|| format!("{} is outside {}", request.url, self.base_url))?;
        Ok(self
            .server
            .handle(request.method, target, &request.headers, request.body.as_deref()))
    }
}
