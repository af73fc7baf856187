//! Transport layer abstraction.

use crate::error::{ClientError, ClientResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// A transport carries JSON requests to the API and returns JSON responses.
///
/// Implementations map any status outside 200, 201 and 202 to
/// [`ClientError::Remote`] and connection failures to
/// [`ClientError::Transport`]. Timeouts and TLS belong here too; the engine
/// adds no retry or timeout logic of its own.
pub trait Transport: Send + Sync {
    /// Sends a GET with query parameters.
    fn get(&self, path: &str, query: &[(String, String)]) -> ClientResult<Value>;

    /// Sends a POST with a JSON body.
    fn post(&self, path: &str, body: &Value) -> ClientResult<Value>;

    /// Sends a PATCH with a JSON body.
    fn patch(&self, path: &str, body: &Value) -> ClientResult<Value>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get(&self, path: &str, query: &[(String, String)]) -> ClientResult<Value> {
        (**self).get(path, query)
    }

    fn post(&self, path: &str, body: &Value) -> ClientResult<Value> {
        (**self).post(path, body)
    }

    fn patch(&self, path: &str, body: &Value) -> ClientResult<Value> {
        (**self).patch(path, body)
    }
}

/// HTTP methods used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read.
    Get,
    /// Create, or trigger an action.
    Post,
    /// Update.
    Patch,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        }
    }
}

/// A request captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Method used.
    pub method: Method,
    /// Path, relative to the API root.
    pub path: String,
    /// Query parameters (GET only).
    pub query: Vec<(String, String)>,
    /// JSON body (POST and PATCH only).
    pub body: Option<Value>,
}

/// A scripted transport for testing.
///
/// Responses are served in the order they were queued, whatever the method.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<ClientResult<Value>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Creates a mock transport with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn push_response(&self, response: Value) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queues a non-success status.
    pub fn push_remote_error(&self, status: u16, body: impl Into<String>) {
        self.push_error(ClientError::Remote {
            status,
            body: body.into(),
        });
    }

    /// Queues an arbitrary error.
    pub fn push_error(&self, error: ClientError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Returns every request seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests seen so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the number of queued responses not yet served.
    pub fn pending_responses(&self) -> usize {
        self.responses.lock().len()
    }

    fn respond(&self, request: RecordedRequest) -> ClientResult<Value> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::transport_fatal("no mock response queued")))
    }
}

impl Transport for MockTransport {
    fn get(&self, path: &str, query: &[(String, String)]) -> ClientResult<Value> {
        self.respond(RecordedRequest {
            method: Method::Get,
            path: path.to_string(),
            query: query.to_vec(),
            body: None,
        })
    }

    fn post(&self, path: &str, body: &Value) -> ClientResult<Value> {
        self.respond(RecordedRequest {
            method: Method::Post,
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body.clone()),
        })
    }

    fn patch(&self, path: &str, body: &Value) -> ClientResult<Value> {
        self.respond(RecordedRequest {
            method: Method::Patch,
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body.clone()),
        })
    }
}
