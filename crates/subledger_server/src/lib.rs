//! # Subledger Server
//!
//! In-memory reference server for the Subledger REST API.
//!
//! This crate provides:
//! - Routing for organizations, books, accounts, journal entries and identities
//! - Id assignment and optimistic version checks (409 on mismatch)
//! - Archive and activate transitions
//! - Filtered, ordered listings with a page limit
//! - Account balances computed from journal entries
//! - Optional Basic authentication
//!
//! # Architecture
//!
//! All state lives in a [`LedgerStore`] behind locks, so a server can be
//! shared between threads. Requests enter either as parsed JSON through
//! [`LedgerServer::handle_json`] or as raw bytes through
//! [`LedgerServer::handle_raw`], which also checks credentials. Every
//! request is logged.
//!
//! # Protocol
//!
//! Single-entity responses are one-key objects keyed by the state tag,
//! e.g. `{"active_book": {...}}`. Listings put their items under
//! `"{state}_{plural}"`, e.g. `{"archived_accounts": [...]}`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod server;
mod store;

pub use auth::{BasicCredentials, KeyValidator, StaticKeys};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler, Route};
pub use server::{parse_query, LedgerServer, LoggedRequest, RawResponse};
pub use store::{Details, LedgerStore, ListQuery, StoredEntity};
