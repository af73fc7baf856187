//! Optimistic sync engine.
//!
//! Every operation is a single blocking request. Updates propose
//! `version + 1` and let the server arbitrate: a rejected save surfaces the
//! server's error as-is and leaves the local entity untouched. Nothing is
//! retried here.

use crate::config::{ClientConfig, Credentials};
use crate::error::{ClientError, ClientResult};
use crate::lifecycle::Transition;
use crate::model::{Account, Model, Resource};
use crate::registry::Registry;
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use std::vec;
use subledger_protocol::{
    action_path, format_timestamp, opt_str_field, resource_path, Action, Ancestors, ApiKey,
    Balance, EntityKind, Envelope, Identity, ListFilter, ProtocolError, StateTag, IDENTITIES_PATH,
};
use tracing::{debug, info, warn};

/// Synchronizes entities with the API.
pub struct SyncEngine<T: Transport> {
    config: ClientConfig,
    transport: Arc<T>,
    registry: Arc<Registry>,
}

impl<T: Transport> SyncEngine<T> {
    /// Creates an engine with its own empty registry.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self::with_registry(config, transport, Arc::new(Registry::new()))
    }

    /// Creates an engine sharing an existing registry.
    pub fn with_registry(config: ClientConfig, transport: T, registry: Arc<Registry>) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            registry,
        }
    }

    /// The configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The identity registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Creates or updates an entity. Returns true if it was created.
    ///
    /// On success the id, version and state tag are taken from the
    /// response and the entity is registered under its id. If the id is
    /// already cached as another kind the entity is left unsaved.
    pub fn save<M: Model>(&self, resource: &Resource<M>) -> ClientResult<bool> {
        let (id, proposed, body, ancestors) = {
            let record = resource.read();
            let mut body = record.body();
            let proposed = match &record.id {
                Some(_) => {
                    let current = record.version.ok_or(ProtocolError::MissingField("version"))?;
                    let next = current
                        .checked_add(1)
                        .ok_or_else(|| ProtocolError::invalid_field("version", format!("{current} cannot be incremented")))?;
                    body.insert("version".into(), Value::from(next));
                    Some(next)
                }
                None => None,
            };
            (record.id.clone(), proposed, Value::Object(body), record.fields.ancestors())
        };

        let path = resource_path(M::KIND, &ancestors, id.as_deref())?;
        let response = match &id {
            None => {
                debug!(kind = %M::KIND, %path, "creating");
                self.transport.post(&path, &body)?
            }
            Some(_) => {
                debug!(kind = %M::KIND, %path, ?proposed, "updating");
                self.transport.patch(&path, &body)?
            }
        };

        let envelope = Envelope::from_value(response)?;
        let state = envelope.state_tag(M::KIND)?;
        let returned_id = envelope.id()?;
        let version = envelope.version()?;

        if let Some(requested) = &id {
            if *requested != returned_id {
                return Err(ClientError::IdentityMismatch {
                    requested: requested.clone(),
                    returned: returned_id,
                });
            }
        }
        if let Some(proposed) = proposed {
            if version != proposed {
                warn!(kind = %M::KIND, id = %returned_id, proposed, version, "server assigned a different version");
            }
        }

        // The kind check runs before the record is touched.
        self.registry.register_with(&returned_id, resource, || {
            let mut record = resource.write();
            record.id = Some(returned_id.clone());
            record.version = Some(version);
            record.state = Some(state);
        })?;

        let created = id.is_none();
        if created {
            info!(kind = %M::KIND, id = %returned_id, "created");
        }
        Ok(created)
    }

    /// Returns the instance for `id`, fetching it only if it is not cached.
    pub fn load<M: Model>(&self, id: &str, ancestors: &Ancestors) -> ClientResult<Resource<M>> {
        if id.is_empty() {
            return Err(ProtocolError::invalid_field("id", "must not be empty").into());
        }
        self.registry.lookup_or_insert(id, || self.fetch(id, ancestors))
    }

    /// Resolves an already fetched snapshot without any request.
    ///
    /// The state comes from the snapshot's `type` field when present.
    pub fn load_from_snapshot<M: Model>(&self, snapshot: &Value, ancestors: &Ancestors) -> ClientResult<Resource<M>> {
        self.decode_snapshot(snapshot, ancestors, None)
    }

    /// Lists the children of `ancestors` with one request.
    ///
    /// Items are resolved through the registry as the listing is consumed.
    pub fn list<M: Model>(&self, ancestors: &Ancestors, filter: &ListFilter) -> ClientResult<Listing<'_, T, M>> {
        let path = resource_path(M::KIND, ancestors, None)?;
        let mut filter = filter.clone();
        if filter.limit.is_none() {
            filter.limit = self.config.default_limit;
        }
        debug!(kind = %M::KIND, %path, state = %filter.state, "listing");

        let mut response = self.transport.get(&path, &filter.to_query())?;
        let key = M::KIND.list_key(filter.state);
        let items = match response.get_mut(&key).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ProtocolError::MalformedEnvelope(format!("expected an array under `{key}`")).into());
            }
        };

        Ok(Listing {
            engine: self,
            items: items.into_iter(),
            ancestors: ancestors.clone(),
            state: StateTag::new(M::KIND, filter.state),
            _model: PhantomData,
        })
    }

    /// Archives an entity.
    pub fn archive<M: Model>(&self, resource: &Resource<M>) -> ClientResult<()> {
        self.transition(resource, Transition::Archive)
    }

    /// Activates an entity.
    pub fn activate<M: Model>(&self, resource: &Resource<M>) -> ClientResult<()> {
        self.transition(resource, Transition::Activate)
    }

    /// Fetches the balance of an account at an instant.
    pub fn balance(&self, account: &Account, at: &DateTime<Utc>) -> ClientResult<Balance> {
        let (id, ancestors) = persisted(account)?;
        let path = action_path(EntityKind::Account, &ancestors, &id, Action::Balance)?;
        debug!(%path, at = %format_timestamp(at), "fetching balance");

        let mut response = self.transport.get(&path, &[("at".to_string(), format_timestamp(at))])?;
        take_field(&mut response, "balance")
    }

    /// Creates an identity and its first API key.
    ///
    /// The returned credentials are not installed anywhere; hand them to
    /// the transport to use them.
    pub fn create_identity(
        &self,
        email: &str,
        description: &str,
        reference: Option<&str>,
    ) -> ClientResult<(Identity, Credentials)> {
        let body = json!({
            "email": email,
            "description": description,
            "reference": reference,
        });
        let mut response = self.transport.post(IDENTITIES_PATH, &body)?;
        let identity: Identity = take_field(&mut response, "active_identity")?;
        let key: ApiKey = take_field(&mut response, "active_key")?;
        info!(identity = %identity.id, key = %key.id, "identity created");
        Ok((identity, Credentials::from(key)))
    }

    fn fetch<M: Model>(&self, id: &str, ancestors: &Ancestors) -> ClientResult<Resource<M>> {
        let path = resource_path(M::KIND, ancestors, Some(id))?;
        debug!(kind = %M::KIND, %path, "fetching");

        let envelope = Envelope::from_value(self.transport.get(&path, &[])?)?;
        let state = envelope.state_tag(M::KIND)?;
        Ok(Resource::from_payload(Some(state), &envelope.payload, ancestors)?)
    }

    fn decode_snapshot<M: Model>(
        &self,
        snapshot: &Value,
        ancestors: &Ancestors,
        state: Option<StateTag>,
    ) -> ClientResult<Resource<M>> {
        self.registry.lookup_or_insert_from_snapshot(snapshot, || {
            let state = match state {
                Some(state) => Some(state),
                None => opt_str_field(snapshot, "type")?
                    .map(|tag| StateTag::parse(M::KIND, &tag))
                    .transpose()?,
            };
            Ok(Resource::from_payload(state, snapshot, ancestors)?)
        })
    }

    fn transition<M: Model>(&self, resource: &Resource<M>, transition: Transition) -> ClientResult<()> {
        let (id, ancestors) = persisted(resource)?;
        let path = action_path(M::KIND, &ancestors, &id, transition.action())?;
        debug!(kind = %M::KIND, %path, "requesting {:?}", transition);

        let envelope = Envelope::from_value(self.transport.post(&path, &json!({}))?)?;
        let state = transition.accept(M::KIND, &envelope.tag)?;
        match envelope.id() {
            Ok(returned) if returned != id => {
                return Err(ClientError::IdentityMismatch {
                    requested: id,
                    returned,
                })
            }
            Ok(_) | Err(ProtocolError::MissingField(_)) => {}
            Err(e) => return Err(e.into()),
        }
        let version = match envelope.version() {
            Ok(version) => Some(version),
            Err(ProtocolError::MissingField(_)) => None,
            Err(e) => return Err(e.into()),
        };

        let mut record = resource.write();
        record.state = Some(state);
        if version.is_some() {
            record.version = version;
        }
        Ok(())
    }
}

/// A single-pass listing.
///
/// The page is fetched up front; each item is resolved through the
/// registry when the iterator reaches it, so an id that is already cached
/// yields the cached instance.
pub struct Listing<'a, T: Transport, M: Model> {
    engine: &'a SyncEngine<T>,
    items: vec::IntoIter<Value>,
    ancestors: Ancestors,
    state: StateTag,
    _model: PhantomData<M>,
}

impl<T: Transport, M: Model> Iterator for Listing<'_, T, M> {
    type Item = ClientResult<Resource<M>>;

    fn next(&mut self) -> Option<Self::Item> {
        let snapshot = self.items.next()?;
        Some(
            self.engine
                .decode_snapshot(&snapshot, &self.ancestors, Some(self.state)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<T: Transport, M: Model> ExactSizeIterator for Listing<'_, T, M> {}

fn persisted<M: Model>(resource: &Resource<M>) -> ClientResult<(String, Ancestors)> {
    let record = resource.read();
    let id = record.id.clone().ok_or(ClientError::NotPersisted { kind: M::KIND })?;
    Ok((id, record.fields.ancestors()))
}

fn take_field<D: DeserializeOwned>(response: &mut Value, field: &'static str) -> ClientResult<D> {
    let raw = match response.get_mut(field).map(Value::take) {
        None | Some(Value::Null) => return Err(ProtocolError::MissingField(field).into()),
        Some(raw) => raw,
    };
    serde_json::from_value(raw).map_err(|e| ProtocolError::invalid_field(field, e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Book, BookFields, OrgFields, Organization};
    use crate::transport::{Method, MockTransport};
    use chrono::TimeZone;
    use subledger_protocol::{LifecycleState, NormalBalance, ValueType};

    fn engine() -> SyncEngine<MockTransport> {
        SyncEngine::new(ClientConfig::default(), MockTransport::new())
    }

    fn created_org(engine: &SyncEngine<MockTransport>) -> Organization {
        engine.transport().push_response(json!({
            "active_org": {"id": "o1", "version": 1, "description": "ACME Inc.", "reference": null}
        }));
        let org = Organization::new("ACME Inc.", None);
        engine.save(&org).unwrap();
        org
    }

    #[test]
    fn create_posts_to_collection() {
        let engine = engine();
        engine.transport().push_response(json!({
            "active_org": {"id": "o1", "version": 1, "description": "ACME Inc.", "reference": "https://acme.example/"}
        }));

        let org = Organization::new("ACME Inc.", Some("https://acme.example/".into()));
        assert!(engine.save(&org).unwrap());

        let request = &engine.transport().requests()[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/orgs");
        assert_eq!(
            request.body,
            Some(json!({"description": "ACME Inc.", "reference": "https://acme.example/"}))
        );

        assert_eq!(org.id().as_deref(), Some("o1"));
        assert_eq!(org.version(), Some(1));
        assert!(org.is_active());
        assert!(engine.registry().contains("o1"));
    }

    #[test]
    fn update_proposes_next_version() {
        let engine = engine();
        let org = created_org(&engine);
        org.set_description("ACME Corp.");
        engine.transport().push_response(json!({
            "active_org": {"id": "o1", "version": 2, "description": "ACME Corp."}
        }));

        assert!(!engine.save(&org).unwrap());

        let request = &engine.transport().requests()[1];
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.path, "/orgs/o1");
        assert_eq!(
            request.body,
            Some(json!({"description": "ACME Corp.", "reference": null, "version": 2}))
        );
        assert_eq!(org.version(), Some(2));
    }

    #[test]
    fn server_version_wins() {
        let engine = engine();
        let org = created_org(&engine);
        engine
            .transport()
            .push_response(json!({"active_org": {"id": "o1", "version": 7}}));

        engine.save(&org).unwrap();
        assert_eq!(org.version(), Some(7));
    }

    #[test]
    fn rejected_update_leaves_entity_untouched() {
        let engine = engine();
        let org = created_org(&engine);
        engine.transport().push_remote_error(409, "version conflict");

        let err = engine.save(&org).unwrap_err();
        assert!(matches!(err, ClientError::Remote { status: 409, ref body } if body == "version conflict"));
        assert_eq!(org.version(), Some(1));
        assert_eq!(engine.transport().pending_responses(), 0);
    }

    #[test]
    fn foreign_tag_is_rejected() {
        let engine = engine();
        engine
            .transport()
            .push_response(json!({"active_book": {"id": "o1", "version": 1}}));

        let org = Organization::new("ACME Inc.", None);
        let err = engine.save(&org).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::UnknownStateTag { .. })
        ));
        assert!(!org.is_persisted());
    }

    #[test]
    fn update_must_keep_id() {
        let engine = engine();
        let org = created_org(&engine);
        engine
            .transport()
            .push_response(json!({"active_org": {"id": "o9", "version": 2}}));

        let err = engine.save(&org).unwrap_err();
        assert!(matches!(err, ClientError::IdentityMismatch { .. }));
        assert_eq!(org.id().as_deref(), Some("o1"));
    }

    #[test]
    fn exhausted_version_is_rejected_before_sending() {
        let engine = engine();
        engine.transport().push_response(json!({
            "active_org": {"id": "o1", "version": u64::MAX, "description": "ACME Inc."}
        }));
        let org = Organization::new("ACME Inc.", None);
        engine.save(&org).unwrap();

        let err = engine.save(&org).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::InvalidField { field: "version", .. })
        ));
        assert_eq!(engine.transport().request_count(), 1);
        assert_eq!(org.version(), Some(u64::MAX));
    }

    #[test]
    fn id_taken_by_another_kind_leaves_entity_unsaved() {
        let engine = engine();
        let org = created_org(&engine);
        engine
            .transport()
            .push_response(json!({"active_book": {"id": "o1", "version": 1, "description": "USD"}}));

        let book = Book::new(&org, "USD", None).unwrap();
        let err = engine.save(&book).unwrap_err();
        assert!(matches!(err, ClientError::KindMismatch { .. }));
        assert!(!book.is_persisted());
        assert_eq!(book.version(), None);
        assert!(book.state_tag().is_none());
        assert!(Organization::from_id(&engine, "o1").unwrap().ptr_eq(&org));
    }

    #[test]
    fn load_hits_cache_after_save() {
        let engine = engine();
        let org = created_org(&engine);

        let loaded = Organization::from_id(&engine, "o1").unwrap();
        assert!(loaded.ptr_eq(&org));
        assert_eq!(engine.transport().request_count(), 1);
    }

    #[test]
    fn load_fetches_once() {
        let engine = engine();
        engine.transport().push_response(json!({
            "archived_book": {"id": "b1", "org": "o1", "version": 3, "description": "USD"}
        }));

        let first = Book::from_id(&engine, "b1", "o1").unwrap();
        let second = Book::from_id(&engine, "b1", "o1").unwrap();
        assert!(first.ptr_eq(&second));
        assert!(!first.is_active());
        assert_eq!(engine.transport().requests()[0].path, "/orgs/o1/books/b1");
        assert_eq!(engine.transport().request_count(), 1);
    }

    #[test]
    fn load_rejects_empty_id() {
        let engine = engine();
        assert!(Organization::from_id(&engine, "").is_err());
        assert_eq!(engine.transport().request_count(), 0);
    }

    #[test]
    fn failed_load_is_retried() {
        let engine = engine();
        engine.transport().push_error(ClientError::transport_retryable("timed out"));
        engine
            .transport()
            .push_response(json!({"active_org": {"id": "o1", "version": 1, "description": "ACME Inc."}}));

        assert!(Organization::from_id(&engine, "o1").unwrap_err().is_retryable());
        assert!(Organization::from_id(&engine, "o1").is_ok());
        assert_eq!(engine.transport().request_count(), 2);
    }

    #[test]
    fn list_then_load_shares_instances() {
        let engine = engine();
        let org = created_org(&engine);
        engine.transport().push_response(json!({
            "active_books": [
                {"id": "b1", "org": "o1", "version": 1, "description": "USD"},
                {"id": "b2", "version": 4, "description": "EUR"}
            ]
        }));

        let books: Vec<Book> = Book::all(&engine, &org, &ListFilter::default())
            .unwrap()
            .collect::<ClientResult<_>>()
            .unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[1].org_id(), "o1");
        assert!(books.iter().all(|book| book.is_active()));

        let request = &engine.transport().requests()[1];
        assert_eq!(request.path, "/orgs/o1/books");
        assert_eq!(request.query[0], ("state".to_string(), "active".to_string()));

        let again = Book::from_id(&engine, "b2", "o1").unwrap();
        assert!(again.ptr_eq(&books[1]));
        assert_eq!(engine.transport().request_count(), 2);
    }

    #[test]
    fn list_archived_reads_archived_key() {
        let engine = engine();
        engine.transport().push_response(json!({
            "archived_orgs": [{"id": "o3", "version": 2, "description": "Old Co."}]
        }));

        let filter = ListFilter::new().with_state(LifecycleState::Archived).with_limit(5);
        let orgs: Vec<Organization> = Organization::all(&engine, &filter)
            .unwrap()
            .collect::<ClientResult<_>>()
            .unwrap();
        assert!(!orgs[0].is_active());
        assert!(engine.transport().requests()[0]
            .query
            .contains(&("limit".to_string(), "5".to_string())));
    }

    #[test]
    fn list_applies_default_limit() {
        let engine = SyncEngine::new(
            ClientConfig::default().with_default_limit(25),
            MockTransport::new(),
        );
        engine.transport().push_response(json!({"active_orgs": []}));

        let listing = Organization::all(&engine, &ListFilter::default()).unwrap();
        assert_eq!(listing.len(), 0);
        assert!(engine.transport().requests()[0]
            .query
            .contains(&("limit".to_string(), "25".to_string())));
    }

    #[test]
    fn list_without_key_is_malformed() {
        let engine = engine();
        engine.transport().push_response(json!({"active_books": []}));
        let err = Organization::all(&engine, &ListFilter::default()).err().unwrap();
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn snapshot_state_from_type_field() {
        let engine = engine();
        let snapshot = json!({"id": "o5", "version": 1, "description": "x", "type": "archived_org"});
        let org = engine.load_from_snapshot::<OrgFields>(&snapshot, &Ancestors::none()).unwrap();
        assert!(!org.is_active());
        assert_eq!(engine.transport().request_count(), 0);

        let bad = json!({"id": "o6", "version": 1, "description": "x", "type": "archived_book"});
        assert!(engine.load_from_snapshot::<OrgFields>(&bad, &Ancestors::none()).is_err());
    }

    #[test]
    fn archive_then_activate() {
        let engine = engine();
        let org = created_org(&engine);

        engine
            .transport()
            .push_response(json!({"archived_org": {"id": "o1", "version": 1}}));
        engine.archive(&org).unwrap();
        assert!(!org.is_active());

        engine.transport().push_response(json!({"active_org": {"id": "o1"}}));
        engine.activate(&org).unwrap();
        assert!(org.is_active());
        assert_eq!(org.version(), Some(1));

        let requests = engine.transport().requests();
        assert_eq!(requests[1].path, "/orgs/o1/archive");
        assert_eq!(requests[1].body, Some(json!({})));
        assert_eq!(requests[2].path, "/orgs/o1/activate");
    }

    #[test]
    fn transition_rejects_wrong_tag() {
        let engine = engine();
        let org = created_org(&engine);
        engine
            .transport()
            .push_response(json!({"active_org": {"id": "o1", "version": 1}}));

        let err = engine.archive(&org).unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedStateTag { .. }));
        assert!(org.is_active());
    }

    #[test]
    fn transition_rejects_other_id() {
        let engine = engine();
        let org = created_org(&engine);
        engine
            .transport()
            .push_response(json!({"archived_org": {"id": "o2", "version": 1}}));

        let err = engine.archive(&org).unwrap_err();
        assert!(matches!(
            err,
            ClientError::IdentityMismatch { ref requested, ref returned } if requested == "o1" && returned == "o2"
        ));
        assert!(org.is_active());
    }

    #[test]
    fn transition_requires_id() {
        let engine = engine();
        let err = engine.archive(&Organization::new("ACME Inc.", None)).unwrap_err();
        assert!(matches!(
            err,
            ClientError::NotPersisted {
                kind: EntityKind::Organization
            }
        ));
        assert_eq!(engine.transport().request_count(), 0);
    }

    #[test]
    fn parent_resolution_uses_cache() {
        let engine = engine();
        let org = created_org(&engine);
        engine.transport().push_response(json!({
            "active_book": {"id": "b1", "org": "o1", "version": 1, "description": "USD"}
        }));
        let book = Book::new(&org, "USD", None).unwrap();
        engine.save(&book).unwrap();

        assert!(book.organization(&engine).unwrap().ptr_eq(&org));
        assert!(engine.load::<BookFields>("b1", &Ancestors::org("o1")).unwrap().ptr_eq(&book));
        assert_eq!(engine.transport().request_count(), 2);
    }

    #[test]
    fn balance_query() {
        let engine = engine();
        let book = Book::in_org("o1", "USD", None);
        book.write().id = Some("b1".into());
        let account = Account::new(&book, "Cash", NormalBalance::Debit, None).unwrap();
        account.write().id = Some("a1".into());

        engine.transport().push_response(json!({
            "balance": {
                "debit_value": {"type": "debit", "amount": "10.00"},
                "credit_value": {"type": "zero", "amount": "0"},
                "value": {"type": "debit", "amount": "10.00"}
            }
        }));
        let at = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let balance = account.balance(&engine, &at).unwrap();
        assert_eq!(balance.value.kind, ValueType::Debit);

        let request = &engine.transport().requests()[0];
        assert_eq!(request.path, "/orgs/o1/books/b1/accounts/a1/balance");
        assert_eq!(request.query, vec![("at".to_string(), "2024-06-30T00:00:00Z".to_string())]);
    }

    #[test]
    fn identity_bootstrap() {
        let engine = engine();
        engine.transport().push_response(json!({
            "active_identity": {"id": "i1", "email": "ops@acme.example", "description": "Ops", "version": 1},
            "active_key": {"id": "k1", "identity": "i1", "secret": "s3cret"}
        }));

        let (identity, credentials) = engine
            .create_identity("ops@acme.example", "Ops", None)
            .unwrap();
        assert_eq!(identity.id, "i1");
        assert_eq!(credentials, Credentials::new("k1", "s3cret"));
        assert_eq!(engine.transport().requests()[0].path, "/identities");
    }

    #[test]
    fn identity_response_must_carry_key() {
        let engine = engine();
        engine.transport().push_response(json!({
            "active_identity": {"id": "i1", "email": "ops@acme.example", "description": "Ops", "version": 1}
        }));
        let err = engine.create_identity("ops@acme.example", "Ops", None).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(ProtocolError::MissingField("active_key"))));
    }
}
