//! Accounts.

use super::{ancestor_field, AnyResource, Book, BookFields, Model, OrgFields, Organization, Resource};
use crate::engine::{Listing, SyncEngine};
use crate::error::{ClientError, ClientResult};
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use subledger_protocol::{
    str_field, Ancestors, Balance, EntityKind, ListFilter, NormalBalance, ProtocolResult,
};

/// Account fields: the full ancestor chain and the normal balance side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFields {
    /// Owning organization.
    pub org_id: String,
    /// Owning book.
    pub book_id: String,
    /// Side the account normally carries its balance on.
    pub normal_balance: NormalBalance,
}

/// An account within a book.
pub type Account = Resource<AccountFields>;

impl Model for AccountFields {
    const KIND: EntityKind = EntityKind::Account;

    fn ancestors(&self) -> Ancestors {
        Ancestors::book(self.org_id.clone(), self.book_id.clone())
    }

    fn write_fields(&self, body: &mut Map<String, Value>) {
        body.insert(
            "normal_balance".into(),
            Value::String(self.normal_balance.as_str().into()),
        );
    }

    fn read_fields(payload: &Value, context: &Ancestors) -> ProtocolResult<Self> {
        Ok(Self {
            org_id: ancestor_field(payload, "org", context.org.as_ref(), Self::KIND)?,
            book_id: ancestor_field(payload, "book", context.book.as_ref(), Self::KIND)?,
            normal_balance: NormalBalance::parse(str_field(payload, "normal_balance")?)?,
        })
    }

    fn into_any(resource: Resource<Self>) -> AnyResource {
        AnyResource::Account(resource)
    }

    fn from_any(any: &AnyResource) -> Option<Resource<Self>> {
        match any {
            AnyResource::Account(account) => Some(account.clone()),
            _ => None,
        }
    }
}

impl Resource<AccountFields> {
    /// Creates an unsaved account in a saved book.
    pub fn new(
        book: &Book,
        description: impl Into<String>,
        normal_balance: NormalBalance,
        reference: Option<String>,
    ) -> ClientResult<Self> {
        let book_id = book.id().ok_or(ClientError::NotPersisted {
            kind: EntityKind::Book,
        })?;
        Ok(Self::unsaved(
            description,
            reference,
            AccountFields {
                org_id: book.org_id(),
                book_id,
                normal_balance,
            },
        ))
    }

    /// Loads an account, reusing the cached instance if there is one.
    pub fn from_id<T: Transport>(
        engine: &SyncEngine<T>,
        id: &str,
        org_id: &str,
        book_id: &str,
    ) -> ClientResult<Self> {
        engine.load(id, &Ancestors::book(org_id, book_id))
    }

    /// Lists the accounts of a book.
    pub fn all<'a, T: Transport>(
        engine: &'a SyncEngine<T>,
        book: &Book,
        filter: &ListFilter,
    ) -> ClientResult<Listing<'a, T, AccountFields>> {
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

    /// Side the account normally carries its balance on.
    pub fn normal_balance(&self) -> NormalBalance {
        self.read().fields.normal_balance
    }

    /// Changes the normal balance side; takes effect on the next save.
    pub fn set_normal_balance(&self, normal_balance: NormalBalance) {
        self.write().fields.normal_balance = normal_balance;
    }

    /// Resolves the owning book through the registry.
    pub fn book<T: Transport>(&self, engine: &SyncEngine<T>) -> ClientResult<Book> {
        engine.load::<BookFields>(&self.book_id(), &Ancestors::org(self.org_id()))
    }

    /// Resolves the owning organization through the registry.
    pub fn organization<T: Transport>(&self, engine: &SyncEngine<T>) -> ClientResult<Organization> {
        engine.load::<OrgFields>(&self.org_id(), &Ancestors::none())
    }

    /// Fetches the server-computed balance at `at`.
    pub fn balance<T: Transport>(&self, engine: &SyncEngine<T>, at: &DateTime<Utc>) -> ClientResult<Balance> {
        engine.balance(self, at)
    }
}
