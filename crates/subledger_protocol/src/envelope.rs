//! One-key response envelopes.
//!
//! Every single-entity response is an object with exactly one key, the state
//! tag, wrapping the entity payload:
//!
//! ```json
//! {"active_book": {"id": "...", "org": "...", "version": 3, ...}}
//! ```
//!
//! The key is taken generically and validated afterwards, so no call site
//! hard-codes the key it expects.

use crate::error::{ProtocolError, ProtocolResult};
use crate::kind::{EntityKind, StateTag};
use serde_json::{Map, Value};

/// A decoded `{tag: payload}` response.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// The sole top-level key.
    pub tag: String,
    /// The value under that key.
    pub payload: Value,
}

impl Envelope {
    /// Splits a response into its tag and payload.
    pub fn from_value(value: Value) -> ProtocolResult<Self> {
        let Value::Object(map) = value else {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "expected an object, got {}",
                json_type(&value)
            )));
        };
        if map.len() != 1 {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "expected exactly one key, got {}",
                map.len()
            )));
        }
        let (tag, payload) = map
            .into_iter()
            .next()
            .ok_or_else(|| ProtocolError::MalformedEnvelope("empty object".into()))?;
        Ok(Self { tag, payload })
    }

    /// Validates the tag against `kind`'s tag set.
    pub fn state_tag(&self, kind: EntityKind) -> ProtocolResult<StateTag> {
        StateTag::parse(kind, &self.tag)
    }

    /// The entity id carried by the payload.
    pub fn id(&self) -> ProtocolResult<String> {
        str_field(&self.payload, "id").map(str::to_string)
    }

    /// The entity version carried by the payload.
    pub fn version(&self) -> ProtocolResult<u64> {
        version_field(&self.payload)
    }
}

/// Reads a required string field.
pub fn str_field<'a>(payload: &'a Value, field: &'static str) -> ProtocolResult<&'a str> {
    match payload.get(field) {
        Some(Value::String(s)) => Ok(s),
        None | Some(Value::Null) => Err(ProtocolError::MissingField(field)),
        Some(other) => Err(ProtocolError::invalid_field(
            field,
            format!("expected a string, got {}", json_type(other)),
        )),
    }
}

/// Reads an optional string field; `null` and absence both mean `None`.
pub fn opt_str_field(payload: &Value, field: &'static str) -> ProtocolResult<Option<String>> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ProtocolError::invalid_field(
            field,
            format!("expected a string, got {}", json_type(other)),
        )),
    }
}

/// Reads the `version` field, which must be a positive integer.
pub fn version_field(payload: &Value) -> ProtocolResult<u64> {
    match payload.get("version") {
        None | Some(Value::Null) => Err(ProtocolError::MissingField("version")),
        Some(value) => value
            .as_u64()
            .filter(|v| *v > 0)
            .ok_or_else(|| ProtocolError::invalid_field("version", format!("expected a positive integer, got {value}"))),
    }
}

/// Reads the id of a snapshot; `null` or absence means "not persisted".
pub fn snapshot_id(payload: &Value) -> ProtocolResult<Option<String>> {
    opt_str_field(payload, "id")
}

/// Wraps a payload into a one-key envelope.
pub fn wrap(tag: &str, payload: Value) -> Value {
    let mut map = Map::new();
    map.insert(tag.to_string(), payload);
    Value::Object(map)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
