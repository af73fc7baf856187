//! Entity model.
//!
//! Each kind is a [`Resource`] handle over a shared [`Record`]. Handles are
//! cheap to clone and all clones observe the same state, which is what lets
//! the [`Registry`](crate::Registry) hand out one instance per remote id.
//!
//! Parents are held as plain ids and resolved on demand through the engine,
//! so building an entity never fetches its ancestor chain.

mod account;
mod book;
mod journal_entry;
mod organization;

pub use account::{Account, AccountFields};
pub use book::{Book, BookFields};
pub use journal_entry::{EntryFields, JournalEntry};
pub use organization::{OrgFields, Organization};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use subledger_protocol::{
    opt_str_field, snapshot_id, str_field, version_field, Ancestors, EntityKind, ProtocolError,
    ProtocolResult, StateTag,
};

/// Per-kind behaviour: addressing, tag set and field (de)serialization.
pub trait Model: Clone + fmt::Debug + Send + Sync + Sized + 'static {
    /// The kind this model describes.
    const KIND: EntityKind;

    /// Ancestor ids needed to address an entity of this kind.
    fn ancestors(&self) -> Ancestors;

    /// Writes the kind-specific request fields.
    fn write_fields(&self, body: &mut Map<String, Value>);

    /// Reads the kind-specific fields from a payload.
    ///
    /// Ancestor ids missing from the payload are taken from `context`.
    fn read_fields(payload: &Value, context: &Ancestors) -> ProtocolResult<Self>;

    /// Wraps a handle for storage in the registry.
    fn into_any(resource: Resource<Self>) -> AnyResource;

    /// Extracts a handle of this kind from the registry's storage.
    fn from_any(any: &AnyResource) -> Option<Resource<Self>>;
}

/// State shared by every handle to one entity.
#[derive(Debug, Clone)]
pub struct Record<M> {
    pub(crate) id: Option<String>,
    pub(crate) version: Option<u64>,
    pub(crate) state: Option<StateTag>,
    pub(crate) description: String,
    pub(crate) reference: Option<String>,
    pub(crate) fields: M,
}

impl<M: Model> Record<M> {
    /// Request body: mutable fields only, never id, version or state.
    pub(crate) fn body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("description".into(), Value::String(self.description.clone()));
        body.insert(
            "reference".into(),
            self.reference.clone().map_or(Value::Null, Value::String),
        );
        self.fields.write_fields(&mut body);
        body
    }
}

/// A shared handle to one entity.
pub struct Resource<M: Model> {
    shared: Arc<RwLock<Record<M>>>,
}

impl<M: Model> Clone for Resource<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: Model> Resource<M> {
    /// Creates an unsaved entity.
    pub(crate) fn unsaved(description: impl Into<String>, reference: Option<String>, fields: M) -> Self {
        Self::from_record(Record {
            id: None,
            version: None,
            state: None,
            description: description.into(),
            reference,
            fields,
        })
    }

    pub(crate) fn from_record(record: Record<M>) -> Self {
        Self {
            shared: Arc::new(RwLock::new(record)),
        }
    }

    /// Builds an entity from a server payload.
    pub(crate) fn from_payload(
        state: Option<StateTag>,
        payload: &Value,
        context: &Ancestors,
    ) -> ProtocolResult<Self> {
        let id = snapshot_id(payload)?;
        let version = match version_field(payload) {
            Ok(version) => Some(version),
            Err(ProtocolError::MissingField(_)) if id.is_none() => None,
            Err(e) => return Err(e),
        };
        Ok(Self::from_record(Record {
            id,
            version,
            state,
            description: str_field(payload, "description")?.to_string(),
            reference: opt_str_field(payload, "reference")?,
            fields: M::read_fields(payload, context)?,
        }))
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Record<M>> {
        self.shared.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Record<M>> {
        self.shared.write()
    }

    /// The kind of this entity.
    pub fn kind(&self) -> EntityKind {
        M::KIND
    }

    /// Server-assigned id, `None` until the first save.
    pub fn id(&self) -> Option<String> {
        self.read().id.clone()
    }

    /// Last version acknowledged by the server.
    pub fn version(&self) -> Option<u64> {
        self.read().version
    }

    /// Last state tag reported by the server.
    pub fn state_tag(&self) -> Option<StateTag> {
        self.read().state
    }

    /// True if the server reports this entity as active.
    ///
    /// Entities that have never been saved are not active.
    pub fn is_active(&self) -> bool {
        self.read().state.is_some_and(|tag| tag.is_active())
    }

    /// True once the entity has an id.
    pub fn is_persisted(&self) -> bool {
        self.read().id.is_some()
    }

    /// Display string.
    pub fn description(&self) -> String {
        self.read().description.clone()
    }

    /// Changes the display string; takes effect on the next save.
    pub fn set_description(&self, description: impl Into<String>) {
        self.write().description = description.into();
    }

    /// External reference.
    pub fn reference(&self) -> Option<String> {
        self.read().reference.clone()
    }

    /// Changes the external reference; takes effect on the next save.
    pub fn set_reference(&self, reference: Option<String>) {
        self.write().reference = reference;
    }

    /// Ancestor ids of this entity.
    pub fn ancestors(&self) -> Ancestors {
        self.read().fields.ancestors()
    }

    /// Copy of the kind-specific fields.
    pub fn fields(&self) -> M {
        self.read().fields.clone()
    }

    /// True if both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<M: Model> fmt::Debug for Resource<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resource").field(&*self.read()).finish()
    }
}

impl<M: Model> fmt::Display for Resource<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.read();
        write!(
            f,
            "{:?}({}) {}",
            M::KIND,
            record.description,
            record.id.as_deref().unwrap_or("<unsaved>")
        )
    }
}

/// A handle of any kind, as stored in the registry.
#[derive(Debug, Clone)]
pub enum AnyResource {
    /// An organization.
    Organization(Organization),
    /// A book.
    Book(Book),
    /// An account.
    Account(Account),
    /// A journal entry.
    JournalEntry(JournalEntry),
}

impl AnyResource {
    /// Kind of the wrapped handle.
    pub fn kind(&self) -> EntityKind {
        match self {
            AnyResource::Organization(_) => EntityKind::Organization,
            AnyResource::Book(_) => EntityKind::Book,
            AnyResource::Account(_) => EntityKind::Account,
            AnyResource::JournalEntry(_) => EntityKind::JournalEntry,
        }
    }

    /// Id of the wrapped handle.
    pub fn id(&self) -> Option<String> {
        match self {
            AnyResource::Organization(r) => r.id(),
            AnyResource::Book(r) => r.id(),
            AnyResource::Account(r) => r.id(),
            AnyResource::JournalEntry(r) => r.id(),
        }
    }
}

/// Resolves an ancestor id from the payload, falling back to `context`.
pub(crate) fn ancestor_field(
    payload: &Value,
    field: &'static str,
    fallback: Option<&String>,
    kind: EntityKind,
) -> ProtocolResult<String> {
    match opt_str_field(payload, field)? {
        Some(id) if !id.is_empty() => Ok(id),
        _ => fallback
            .filter(|id| !id.is_empty())
            .cloned()
            .ok_or(ProtocolError::MissingAncestor {
                kind,
                ancestor: field,
            }),
    }
}
