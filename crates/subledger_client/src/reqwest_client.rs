//! Blocking `reqwest` backend for [`HttpTransport`].

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse, HttpTransport};
use crate::transport::Method;

/// An [`HttpClient`] backed by `reqwest::blocking`.
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds a client honouring the configured timeout and user agent.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::transport_fatal(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
        };
        let mut builder = self.inner.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

impl HttpTransport<ReqwestClient> {
    /// Creates a transport talking to the real API.
    pub fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let client = ReqwestClient::new(config)?;
        Ok(Self::new(config, client))
    }
}
