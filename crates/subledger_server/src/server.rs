//! Main reference server.

use crate::auth::{BasicCredentials, KeyValidator, StaticKeys};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler, Route};
use crate::store::LedgerStore;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// A request as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedRequest {
    /// Method.
    pub method: String,
    /// Path, without the query string.
    pub path: String,
}

/// A raw HTTP-style response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Status code.
    pub status: u16,
    /// JSON body.
    pub body: Vec<u8>,
}

/// In-memory implementation of the ledger API.
///
/// Every request is logged so tests can assert how many fetches an
/// operation caused.
///
/// # Example
///
/// ```
/// use subledger_server::{LedgerServer, ServerConfig};
///
/// let server = LedgerServer::new(ServerConfig::default());
/// let (status, body) = server
///     .handle_json("POST", "/orgs", &[], Some(&serde_json::json!({"description": "ACME Inc."})))
///     .unwrap();
/// assert_eq!(status, 201);
/// assert!(body["active_org"]["id"].is_string());
/// ```
pub struct LedgerServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
    configured_keys: StaticKeys,
    log: Mutex<Vec<LoggedRequest>>,
}

impl LedgerServer {
    /// Creates a server with an empty store.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(LedgerStore::new()))
    }

    /// Creates a server over an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<LedgerStore>) -> Self {
        let configured_keys = StaticKeys::new(config.api_keys.clone());
        let context = Arc::new(HandlerContext::new(config, store));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self {
            handler,
            context,
            configured_keys,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Handles a parsed JSON request without authentication.
    ///
    /// Returns the success status and body, or the error the server would
    /// answer with.
    pub fn handle_json(
        &self,
        method: &str,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> ServerResult<(u16, Value)> {
        self.log.lock().push(LoggedRequest {
            method: method.to_string(),
            path: path.to_string(),
        });
        debug!(method, path, "request");

        let route = Route::parse(path)?;
        self.handler.handle(method, &route, query, body).inspect_err(|e| {
            debug!(method, path, status = e.status_code(), error = %e, "request failed");
        })
    }

    /// Handles a raw request: `target` is the path plus query string.
    ///
    /// Checks Basic credentials when authentication is enabled; identity
    /// creation is always open.
    pub fn handle_raw(
        &self,
        method: &str,
        target: &str,
        authorization: Option<&str>,
        body: Option<&[u8]>,
    ) -> RawResponse {
        match self.dispatch_raw(method, target, authorization, body) {
            Ok((status, value)) => RawResponse {
                status,
                body: value.to_string().into_bytes(),
            },
            Err(e) => RawResponse {
                status: e.status_code(),
                body: json!({ "error": e.to_string() }).to_string().into_bytes(),
            },
        }
    }

    fn dispatch_raw(
        &self,
        method: &str,
        target: &str,
        authorization: Option<&str>,
        body: Option<&[u8]>,
    ) -> ServerResult<(u16, Value)> {
        let (path, raw_query) = target.split_once('?').unwrap_or((target, ""));
        if self.context.config.require_auth && path != "/identities" {
            self.authenticate(authorization).inspect_err(|e| {
                warn!(method, path, error = %e, "rejected request");
            })?;
        }

        let query = parse_query(raw_query)?;
        let body = match body {
            None => None,
            Some(bytes) if bytes.is_empty() => None,
            Some(bytes) => Some(
                serde_json::from_slice::<Value>(bytes)
                    .map_err(|e| ServerError::InvalidRequest(format!("invalid JSON body: {e}")))?,
            ),
        };
        self.handle_json(method, path, &query, body.as_ref())
    }

    fn authenticate(&self, authorization: Option<&str>) -> ServerResult<()> {
        let header =
            authorization.ok_or_else(|| ServerError::AuthenticationFailed("missing credentials".into()))?;
        let credentials = BasicCredentials::parse(header)?;
        let valid = self.configured_keys.is_valid(&credentials.key_id, &credentials.secret)
            || self.context.store.is_valid(&credentials.key_id, &credentials.secret);
        if valid {
            Ok(())
        } else {
            Err(ServerError::AuthenticationFailed(format!(
                "unknown key {}",
                credentials.key_id
            )))
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<LedgerStore> {
        &self.context.store
    }

    /// The configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<LoggedRequest> {
        self.log.lock().clone()
    }

    /// Number of requests seen so far.
    pub fn request_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Number of requests with the given method and path.
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    /// Forgets the request log.
    pub fn clear_log(&self) {
        self.log.lock().clear();
    }
}

/// Splits and percent-decodes a query string.
pub fn parse_query(raw: &str) -> ServerResult<Vec<(String, String)>> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok((decode(key)?, decode(value)?))
        })
        .collect()
}

fn decode(raw: &str) -> ServerResult<String> {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ServerError::InvalidRequest(format!("invalid query encoding: {e}")))
}
