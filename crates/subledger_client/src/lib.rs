//! # Subledger Client
//!
//! Client-side synchronization layer for the Subledger REST API.
//!
//! This crate provides:
//! - Entity handles for organizations, books, accounts and journal entries
//! - An identity registry keeping one instance per remote id
//! - Optimistic create/update with server-arbitrated versions
//! - Archive and activate transitions
//! - Filtered listings, account balances and identity bootstrap
//! - A pluggable HTTP transport with Basic authentication
//!
//! ## Architecture
//!
//! Entities are cheap, shared handles. The [`SyncEngine`] turns each
//! operation into exactly one request through a [`Transport`] and folds the
//! server's reply back into the handle. The [`Registry`] makes sure every
//! lookup of an id returns the same handle, fetching it at most once even
//! under concurrent lookups.
//!
//! ## Key Invariants
//!
//! - The server is authoritative for id, version and state
//! - An update always proposes the current version plus one
//! - A rejected request leaves the local entity untouched
//! - Nothing is retried by the client

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod http;
mod lifecycle;
mod model;
mod registry;
#[cfg(feature = "reqwest")]
mod reqwest_client;
mod transport;

pub use config::{ClientConfig, Credentials, DEFAULT_BASE_URL, ENV_API_URL, ENV_KEY_ID, ENV_SECRET};
pub use engine::{Listing, SyncEngine};
pub use error::{ClientError, ClientResult};
pub use http::{
    basic_auth, encode_query, HttpClient, HttpRequest, HttpResponse, HttpTransport, LoopbackClient,
    LoopbackServer, SUCCESS_STATUSES,
};
pub use lifecycle::Transition;
pub use model::{
    Account, AccountFields, AnyResource, Book, BookFields, EntryFields, JournalEntry, Model,
    OrgFields, Organization, Record, Resource,
};
pub use registry::Registry;
#[cfg(feature = "reqwest")]
pub use reqwest_client::ReqwestClient;
pub use transport::{Method, MockTransport, RecordedRequest, Transport};

pub use subledger_protocol as protocol;
