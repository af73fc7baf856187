//! Organizations.

use super::{AnyResource, Model, Resource};
use crate::engine::{Listing, SyncEngine};
use crate::error::ClientResult;
use crate::transport::Transport;
use serde_json::{Map, Value};
use subledger_protocol::{Ancestors, EntityKind, ListFilter, ProtocolResult};

/// Organizations carry no fields beyond the common ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgFields;

/// The owner of one or more books, e.g. one book per currency.
pub type Organization = Resource<OrgFields>;

impl Model for OrgFields {
    const KIND: EntityKind = EntityKind::Organization;

    fn ancestors(&self) -> Ancestors {
        Ancestors::none()
    }

    fn write_fields(&self, _body: &mut Map<String, Value>) {}

    fn read_fields(_payload: &Value, _context: &Ancestors) -> ProtocolResult<Self> {
        Ok(OrgFields)
    }

    fn into_any(resource: Resource<Self>) -> AnyResource {
        AnyResource::Organization(resource)
    }

    fn from_any(any: &AnyResource) -> Option<Resource<Self>> {
        match any {
            AnyResource::Organization(org) => Some(org.clone()),
            _ => None,
        }
    }
}

impl Resource<OrgFields> {
    /// Creates an unsaved organization.
    pub fn new(description: impl Into<String>, reference: Option<String>) -> Self {
        Self::unsaved(description, reference, OrgFields)
    }

    /// Loads an organization, reusing the cached instance if there is one.
    pub fn from_id<T: Transport>(engine: &SyncEngine<T>, id: &str) -> ClientResult<Self> {
        engine.load(id, &Ancestors::none())
    }

    /// Lists organizations visible to the current credentials.
    pub fn all<'a, T: Transport>(
        engine: &'a SyncEngine<T>,
        filter: &ListFilter,
    ) -> ClientResult<Listing<'a, T, OrgFields>> {
        engine.list(&Ancestors::none(), filter)
    }
}
