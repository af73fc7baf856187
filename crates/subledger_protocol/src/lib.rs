//! # Subledger Protocol
//!
//! Resource addressing, state tags and wire types for the Subledger REST API.
//!
//! This crate provides:
//! - `EntityKind` with each kind's tag set, path segment and ancestors
//! - `StateTag` validation against a kind's closed tag set
//! - Path resolution from ancestor ids (`resource_path`, `action_path`)
//! - One-key response envelopes (`Envelope`)
//! - Value types: amounts, journal lines, balances, identities
//! - Listing filters
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod error;
mod filter;
mod kind;
mod path;
mod wire;

pub use envelope::{opt_str_field, snapshot_id, str_field, version_field, wrap, Envelope};
pub use error::{ProtocolError, ProtocolResult};
pub use filter::{ListAction, ListFilter};
pub use kind::{EntityKind, LifecycleState, StateTag};
pub use path::{action_path, resource_path, Action, Ancestors, IDENTITIES_PATH};
pub use wire::{
    format_timestamp, parse_timestamp, Amount, ApiKey, Balance, BalanceValue, Identity, Line,
    LineSide, LineValue, NormalBalance, ValueType,
};
