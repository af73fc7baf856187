//! Books of accounts.

use super::{ancestor_field, AnyResource, Model, OrgFields, Organization, Resource};
use crate::engine::{Listing, SyncEngine};
use crate::error::{ClientError, ClientResult};
use crate::transport::Transport;
use serde_json::{Map, Value};
use subledger_protocol::{Ancestors, EntityKind, ListFilter, ProtocolResult};

/// Book fields: the owning organization's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFields {
    /// Owning organization.
    pub org_id: String,
}

/// A book of accounts, used for a single asset or currency.
pub type Book = Resource<BookFields>;

impl Model for BookFields {
    const KIND: EntityKind = EntityKind::Book;

    fn ancestors(&self) -> Ancestors {
        Ancestors::org(self.org_id.clone())
    }

    fn write_fields(&self, _body: &mut Map<String, Value>) {}

    fn read_fields(payload: &Value, context: &Ancestors) -> ProtocolResult<Self> {
        Ok(Self {
            org_id: ancestor_field(payload, "org", context.org.as_ref(), Self::KIND)?,
        })
    }

    fn into_any(resource: Resource<Self>) -> AnyResource {
        AnyResource::Book(resource)
    }

    fn from_any(any: &AnyResource) -> Option<Resource<Self>> {
        match any {
            AnyResource::Book(book) => Some(book.clone()),
            _ => None,
        }
    }
}

impl Resource<BookFields> {
    /// Creates an unsaved book in a saved organization.
    pub fn new(org: &Organization, description: impl Into<String>, reference: Option<String>) -> ClientResult<Self> {
        let org_id = org.id().ok_or(ClientError::NotPersisted {
            kind: EntityKind::Organization,
        })?;
        Ok(Self::in_org(org_id, description, reference))
    }

    /// Creates an unsaved book from its organization's id.
    pub fn in_org(org_id: impl Into<String>, description: impl Into<String>, reference: Option<String>) -> Self {
        Self::unsaved(
            description,
            reference,
            BookFields {
                org_id: org_id.into(),
            },
        )
    }

    /// Loads a book, reusing the cached instance if there is one.
    pub fn from_id<T: Transport>(engine: &SyncEngine<T>, id: &str, org_id: &str) -> ClientResult<Self> {
        engine.load(id, &Ancestors::org(org_id))
    }

    /// Lists the books of an organization.
    pub fn all<'a, T: Transport>(
        engine: &'a SyncEngine<T>,
        org: &Organization,
        filter: &ListFilter,
    ) -> ClientResult<Listing<'a, T, BookFields>> {
        let org_id = org.id().ok_or(ClientError::NotPersisted {
            kind: EntityKind::Organization,
        })?;
        engine.list(&Ancestors::org(org_id), filter)
    }

    /// Id of the owning organization.
    pub fn org_id(&self) -> String {
        self.read().fields.org_id.clone()
    }

    /// Resolves the owning organization through the registry.
    pub fn organization<T: Transport>(&self, engine: &SyncEngine<T>) -> ClientResult<Organization> {
        engine.load::<OrgFields>(&self.org_id(), &Ancestors::none())
    }
}
