//! Shared helpers for integration tests.

#![allow(dead_code)]

use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use subledger_client::protocol::Amount;
use subledger_client::{
    ClientConfig, ClientError, ClientResult, HttpResponse, HttpTransport, LoopbackClient,
    LoopbackServer, Method, SyncEngine, Transport,
};
use subledger_server::{LedgerServer, ServerConfig, ServerError};
use tracing_subscriber::EnvFilter;

/// API root used by the loopback stack.
pub const BASE_URL: &str = "https://ledger.test/v1";

/// Installs a test subscriber; set `RUST_LOG` to see engine logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A transport that calls an in-memory server directly.
pub struct InMemoryTransport {
    server: Arc<LedgerServer>,
    delay: Duration,
}

impl InMemoryTransport {
    pub fn new(server: Arc<LedgerServer>) -> Self {
        Self {
            server,
            delay: Duration::ZERO,
        }
    }

    /// Sleeps before every request, widening race windows.
    pub fn with_delay(server: Arc<LedgerServer>, delay: Duration) -> Self {
        Self { server, delay }
    }

    fn call(
        &self,
        method: &str,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.server
            .handle_json(method, path, query, body)
            .map(|(_, value)| value)
            .map_err(remote)
    }
}

fn remote(err: ServerError) -> ClientError {
    ClientError::Remote {
        status: err.status_code(),
        body: err.to_string(),
    }
}

impl Transport for InMemoryTransport {
    fn get(&self, path: &str, query: &[(String, String)]) -> ClientResult<Value> {
        self.call("GET", path, query, None)
    }

    fn post(&self, path: &str, body: &Value) -> ClientResult<Value> {
        self.call("POST", path, &[], Some(body))
    }

    fn patch(&self, path: &str, body: &Value) -> ClientResult<Value> {
        self.call("PATCH", path, &[], Some(body))
    }
}

/// Exposes a server to [`LoopbackClient`].
pub struct ServerAdapter(pub Arc<LedgerServer>);

impl LoopbackServer for ServerAdapter {
    fn handle(
        &self,
        method: Method,
        target: &str,
        headers: &[(String, String)],
        body: Option<&[u8]>,
    ) -> HttpResponse {
        let authorization = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .map(|(_, value)| value.as_str());
        let response = self.0.handle_raw(method.as_str(), target, authorization, body);
        HttpResponse {
            status: response.status,
            body: response.body,
        }
    }
}

/// Engine type for the full HTTP stack.
pub type HttpEngine = SyncEngine<HttpTransport<LoopbackClient<ServerAdapter>>>;

/// A fresh server and an engine talking to it directly.
pub fn memory_engine() -> (Arc<LedgerServer>, SyncEngine<InMemoryTransport>) {
    init_tracing();
    let server = Arc::new(LedgerServer::new(ServerConfig::default()));
    let engine = SyncEngine::new(ClientConfig::new(BASE_URL), InMemoryTransport::new(Arc::clone(&server)));
    (server, engine)
}

/// An engine over the HTTP stack for an existing server.
pub fn http_engine_for(server: &Arc<LedgerServer>, config: ClientConfig) -> HttpEngine {
    let client = LoopbackClient::new(BASE_URL, ServerAdapter(Arc::clone(server)));
    let transport = HttpTransport::new(&config, client);
    SyncEngine::new(config, transport)
}

/// A fresh server and an engine talking to it over the HTTP stack.
pub fn http_engine(server_config: ServerConfig, client_config: ClientConfig) -> (Arc<LedgerServer>, HttpEngine) {
    init_tracing();
    let server = Arc::new(LedgerServer::new(server_config));
    let engine = http_engine_for(&server, client_config);
    (server, engine)
}

pub fn amount(raw: &str) -> Amount {
    Amount::new(raw).unwrap()
}
