//! Journal entries.

use super::{ancestor_field, AnyResource, Book, BookFields, Model, OrgFields, Organization, Resource};
use crate::engine::{Listing, SyncEngine};
use crate::error::{ClientError, ClientResult};
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use subledger_protocol::{
    format_timestamp, parse_timestamp, str_field, Ancestors, EntityKind, Line, ListFilter,
    ProtocolError, ProtocolResult,
};

/// Journal entry fields.
///
/// Lines are sent as-is; whether they balance is for the server to decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFields {
    /// Owning organization.
    pub org_id: String,
    /// Owning book.
    pub book_id: String,
    /// When the entry takes effect.
    pub effective_at: DateTime<Utc>,
    /// Ordered lines.
    pub lines: Vec<Line>,
}

/// A dated set of lines posted to a book.
pub type JournalEntry = Resource<EntryFields>;

impl Model for EntryFields {
    const KIND: EntityKind = EntityKind::JournalEntry;

    fn ancestors(&self) -> Ancestors {
        Ancestors::book(self.org_id.clone(), self.book_id.clone())
    }

    fn write_fields(&self, body: &mut Map<String, Value>) {
        body.insert(
            "effective_at".into(),
            Value::String(format_timestamp(&self.effective_at)),
        );
        body.insert("lines".into(), self.lines.iter().map(Line::to_json).collect());
    }

    fn read_fields(payload: &Value, context: &Ancestors) -> ProtocolResult<Self> {
        let lines = match payload.get("lines") {
            None | Some(Value::Null) => Vec::new(),
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|e| ProtocolError::invalid_field("lines", e.to_string()))?,
        };
        Ok(Self {
            org_id: ancestor_field(payload, "org", context.org.as_ref(), Self::KIND)?,
            book_id: ancestor_field(payload, "book", context.book.as_ref(), Self::KIND)?,
            effective_at: parse_timestamp("effective_at", str_field(payload, "effective_at")?)?,
            lines,
        })
    }

    fn into_any(resource: Resource<Self>) -> AnyResource {
        AnyResource::JournalEntry(resource)
    }

    fn from_any(any: &AnyResource) -> Option<Resource<Self>> {
        match any {
            AnyResource::JournalEntry(entry) => Some(entry.clone()),
            _ => None,
        }
    }
}

impl Resource<EntryFields> {
    /// Creates an unsaved journal entry in a saved book.
    pub fn new(
        book: &Book,
        description: impl Into<String>,
        effective_at: DateTime<Utc>,
        lines: Vec<Line>,
        reference: Option<String>,
    ) -> ClientResult<Self> {
        let book_id = book.id().ok_or(ClientError::NotPersisted {
            kind: EntityKind::Book,
        })?;
        Ok(Self::unsaved(
            description,
            reference,
            EntryFields {
                org_id: book.org_id(),
                book_id,
                effective_at,
                lines,
            },
        ))
    }

    /// Loads a journal entry, reusing the cached instance if there is one.
    pub fn from_id<T: Transport>(
        engine: &SyncEngine<T>,
        id: &str,
        org_id: &str,
        book_id: &str,
    ) -> ClientResult<Self> {
        engine.load(id, &Ancestors::book(org_id, book_id))
    }

    /// Lists the journal entries of a book.
    pub fn all<'a, T: Transport>(
        engine: &'a SyncEngine<T>,
        book: &Book,
        filter: &ListFilter,
    ) -> ClientResult<Listing<'a, T, EntryFields>> {
        let book_id = book.id().ok_or(ClientError::NotPersisted {
            kind: EntityKind::Book,
        })?;
        engine.list(&Ancestors::book(book.org_id(), book_id), filter)
    }

    /// Id of the owning organization.
    pub fn org_id(&self) -> String {
        self.read().fields.org_id.clone()
    }

    /// Id of the owning book.
    pub fn book_id(&self) -> String {
        self.read().fields.book_id.clone()
    }

    /// When the entry takes effect.
    pub fn effective_at(&self) -> DateTime<Utc> {
        self.read().fields.effective_at
    }

    /// Changes the effective instant; takes effect on the next save.
    pub fn set_effective_at(&self, effective_at: DateTime<Utc>) {
        self.write().fields.effective_at = effective_at;
    }

    /// Copy of the lines.
    pub fn lines(&self) -> Vec<Line> {
        self.read().fields.lines.clone()
    }

    /// Replaces the lines; takes effect on the next save.
    pub fn set_lines(&self, lines: Vec<Line>) {
        self.write().fields.lines = lines;
    }

    /// Resolves the owning book through the registry.
    pub fn book<T: Transport>(&self, engine: &SyncEngine<T>) -> ClientResult<Book> {
        engine.load::<BookFields>(&self.book_id(), &Ancestors::org(self.org_id()))
    }

    /// Resolves the owning organization through the registry.
    pub fn organization<T: Transport>(&self, engine: &SyncEngine<T>) -> ClientResult<Organization> {
        engine.load::<OrgFields>(&self.org_id(), &Ancestors::none())
    }
}
