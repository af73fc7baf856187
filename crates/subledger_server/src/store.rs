//! In-memory entity store.
//!
//! Holds every entity, identity and issued key. Amounts are summed as
//! fixed-point integers with eight decimal places.

use crate::auth::KeyValidator;
use crate::error::{ServerError, ServerResult};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use subledger_protocol::{
    format_timestamp, opt_str_field, parse_timestamp, str_field, wrap, Amount, Ancestors, ApiKey,
    Balance, BalanceValue, EntityKind, Identity, LifecycleState, Line, LineSide, ListAction,
    NormalBalance, StateTag, ValueType,
};
use tracing::debug;
use uuid::Uuid;

/// Decimal places kept when summing amounts.
const SCALE: u32 = 8;

/// Kind-specific fields of a stored entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Details {
    /// Organizations and books.
    None,
    /// Accounts.
    Account {
        /// Normal balance side.
        normal_balance: NormalBalance,
    },
    /// Journal entries.
    Entry {
        /// When the entry takes effect.
        effective_at: DateTime<Utc>,
        /// Posted lines.
        lines: Vec<Line>,
    },
}

/// An entity as the server holds it.
#[derive(Debug, Clone)]
pub struct StoredEntity {
    /// Kind.
    pub kind: EntityKind,
    /// Server-assigned id.
    pub id: String,
    /// Parent ids.
    pub ancestors: Ancestors,
    /// Lifecycle state.
    pub state: LifecycleState,
    /// Current version, starting at 1.
    pub version: u64,
    /// Display string.
    pub description: String,
    /// External reference.
    pub reference: Option<String>,
    /// Kind-specific fields.
    pub details: Details,
    seq: u64,
}

impl StoredEntity {
    /// Current state tag.
    pub fn tag(&self) -> StateTag {
        StateTag::new(self.kind, self.state)
    }

    /// Entity payload as sent to clients.
    pub fn payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("id".into(), Value::String(self.id.clone()));
        payload.insert("description".into(), Value::String(self.description.clone()));
        payload.insert(
            "reference".into(),
            self.reference.clone().map_or(Value::Null, Value::String),
        );
        payload.insert("version".into(), Value::from(self.version));
        if let Some(org) = &self.ancestors.org {
            payload.insert("org".into(), Value::String(org.clone()));
        }
        if let Some(book) = &self.ancestors.book {
            payload.insert("book".into(), Value::String(book.clone()));
        }
        match &self.details {
            Details::None => {}
            Details::Account { normal_balance } => {
                payload.insert("normal_balance".into(), Value::String(normal_balance.as_str().into()));
            }
            Details::Entry { effective_at, lines } => {
                payload.insert("effective_at".into(), Value::String(format_timestamp(effective_at)));
                payload.insert("lines".into(), lines.iter().map(Line::to_json).collect());
            }
        }
        Value::Object(payload)
    }

    /// Payload wrapped under the state tag.
    pub fn envelope(&self) -> Value {
        wrap(self.tag().as_str(), self.payload())
    }

    fn sort_key(&self) -> String {
        match &self.details {
            Details::Entry { effective_at, .. } => format_timestamp(effective_at),
            _ => self.description.clone(),
        }
    }
}

/// Parameters of a collection listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// State to list.
    pub state: LifecycleState,
    /// Direction relative to the anchor.
    pub action: ListAction,
    /// Anchor by id.
    pub id: Option<String>,
    /// Anchor by sort key; used when no id is given.
    pub description: Option<String>,
    /// Page size.
    pub limit: usize,
}

/// In-memory store shared by the request handlers.
#[derive(Debug, Default)]
pub struct LedgerStore {
    entities: RwLock<HashMap<String, StoredEntity>>,
    identities: RwLock<HashMap<String, Identity>>,
    keys: RwLock<HashMap<String, ApiKey>>,
    next_seq: AtomicU64,
}

impl LedgerStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an entity from a request body.
    ///
    /// The parent must exist. Journal entry lines must reference accounts
    /// of the same book and balance.
    pub fn create(&self, kind: EntityKind, ancestors: &Ancestors, body: &Value) -> ServerResult<StoredEntity> {
        let description = str_field(body, "description")?.to_string();
        let reference = opt_str_field(body, "reference")?;
        let details = read_details(kind, body)?;

        let mut entities = self.entities.write();
        check_parent(&entities, kind, ancestors)?;
        if let Details::Entry { lines, .. } = &details {
            check_lines(&entities, ancestors, lines)?;
        }

        let entity = StoredEntity {
            kind,
            id: new_id(),
            ancestors: ancestors.clone(),
            state: LifecycleState::Active,
            version: 1,
            description,
            reference,
            details,
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
        };
        entities.insert(entity.id.clone(), entity.clone());
        debug!(kind = %kind, id = %entity.id, "entity created");
        Ok(entity)
    }

    /// Returns an entity addressed by kind, parents and id.
    pub fn get(&self, kind: EntityKind, ancestors: &Ancestors, id: &str) -> ServerResult<StoredEntity> {
        self.entities
            .read()
            .get(id)
            .filter(|entity| entity.kind == kind && entity.ancestors == *ancestors)
            .cloned()
            .ok_or_else(|| not_found(kind, id))
    }

    /// Replaces an entity's fields.
    ///
    /// The body's `version` must be exactly the stored version plus one.
    pub fn update(
        &self,
        kind: EntityKind,
        ancestors: &Ancestors,
        id: &str,
        body: &Value,
    ) -> ServerResult<StoredEntity> {
        let proposed = body
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| ServerError::InvalidRequest("version must be a positive integer".into()))?;
        let description = str_field(body, "description")?.to_string();
        let reference = opt_str_field(body, "reference")?;
        let details = read_details(kind, body)?;

        let mut entities = self.entities.write();
        let current = entities
            .get(id)
            .filter(|entity| entity.kind == kind && entity.ancestors == *ancestors)
            .map(|entity| entity.version)
            .ok_or_else(|| not_found(kind, id))?;
        let expected = current
            .checked_add(1)
            .ok_or_else(|| ServerError::Internal(format!("version of {id} cannot be incremented")))?;
        if proposed != expected {
            return Err(ServerError::VersionConflict {
                expected,
                actual: proposed,
            });
        }
        if let Details::Entry { lines, .. } = &details {
            check_lines(&entities, ancestors, lines)?;
        }

        let entity = entities.get_mut(id).ok_or_else(|| not_found(kind, id))?;
        entity.version = proposed;
        entity.description = description;
        entity.reference = reference;
        entity.details = details;
        debug!(kind = %kind, id, version = proposed, "entity updated");
        Ok(entity.clone())
    }

    /// Moves an entity to `state`. The version is left unchanged.
    pub fn transition(
        &self,
        kind: EntityKind,
        ancestors: &Ancestors,
        id: &str,
        state: LifecycleState,
    ) -> ServerResult<StoredEntity> {
        let mut entities = self.entities.write();
        let entity = entities
            .get_mut(id)
            .filter(|entity| entity.kind == kind && entity.ancestors == *ancestors)
            .ok_or_else(|| not_found(kind, id))?;
        entity.state = state;
        debug!(kind = %kind, id, state = %state, "entity transitioned");
        Ok(entity.clone())
    }

    /// Lists the children of `ancestors` in one state.
    ///
    /// Items are ordered by description, or by effective instant for
    /// journal entries. Backward actions return items nearest the anchor
    /// first.
    pub fn list(&self, kind: EntityKind, ancestors: &Ancestors, query: &ListQuery) -> ServerResult<Vec<StoredEntity>> {
        let entities = self.entities.read();
        let mut items: Vec<&StoredEntity> = entities
            .values()
            .filter(|entity| entity.kind == kind && entity.ancestors == *ancestors && entity.state == query.state)
            .collect();
        items.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()).then(a.seq.cmp(&b.seq)));

        let len = items.len();
        let anchor = match (&query.id, &query.description) {
            (Some(id), _) => Some(
                items
                    .iter()
                    .position(|entity| entity.id == *id)
                    .ok_or_else(|| not_found(kind, id))?,
            ),
            (None, Some(key)) => Some(
                items
                    .iter()
                    .position(|entity| entity.sort_key() >= *key)
                    .unwrap_or(len),
            ),
            (None, None) => None,
        };

        let selected: Vec<&StoredEntity> = match query.action {
            ListAction::Starting => items[anchor.unwrap_or(0)..].to_vec(),
            ListAction::After | ListAction::Following => {
                items[anchor.map_or(0, |i| (i + 1).min(len))..].to_vec()
            }
            ListAction::Ending => {
                let end = anchor.map_or(len, |i| (i + 1).min(len));
                items[..end].iter().rev().copied().collect()
            }
            ListAction::Before | ListAction::Preceding => {
                items[..anchor.unwrap_or(len)].iter().rev().copied().collect()
            }
        };
        Ok(selected.into_iter().take(query.limit).cloned().collect())
    }

    /// Balance of an account from active entries effective at or before `at`.
    pub fn balance(&self, ancestors: &Ancestors, account_id: &str, at: &DateTime<Utc>) -> ServerResult<Balance> {
        let entities = self.entities.read();
        entities
            .get(account_id)
            .filter(|entity| entity.kind == EntityKind::Account && entity.ancestors == *ancestors)
            .ok_or_else(|| not_found(EntityKind::Account, account_id))?;

        let (mut debit, mut credit) = (0i128, 0i128);
        let entries = entities.values().filter(|entity| {
            entity.kind == EntityKind::JournalEntry
                && entity.ancestors == *ancestors
                && entity.state == LifecycleState::Active
        });
        for entry in entries {
            let Details::Entry { effective_at, lines } = &entry.details else {
                continue;
            };
            if effective_at > at {
                continue;
            }
            for line in lines.iter().filter(|line| line.account_id == account_id) {
                let units = to_units(&line.value.amount)?;
                match line.value.side {
                    LineSide::Debit => debit = checked(debit.checked_add(units))?,
                    LineSide::Credit => credit = checked(credit.checked_add(units))?,
                }
            }
        }

        let net = debit - credit;
        let net_kind = match net {
            n if n > 0 => ValueType::Debit,
            n if n < 0 => ValueType::Credit,
            _ => ValueType::Zero,
        };
        Ok(Balance {
            debit_value: balance_value(if debit > 0 { ValueType::Debit } else { ValueType::Zero }, debit)?,
            credit_value: balance_value(if credit > 0 { ValueType::Credit } else { ValueType::Zero }, credit)?,
            value: balance_value(net_kind, net.abs())?,
        })
    }

    /// Creates an identity together with its first key.
    pub fn create_identity(
        &self,
        email: &str,
        description: &str,
        reference: Option<String>,
    ) -> ServerResult<(Identity, ApiKey)> {
        if !email.contains('@') {
            return Err(ServerError::InvalidRequest(format!("invalid email `{email}`")));
        }
        let identity = Identity {
            id: new_id(),
            email: email.to_string(),
            description: description.to_string(),
            reference,
            version: 1,
        };
        let key = ApiKey {
            id: new_id(),
            identity: identity.id.clone(),
            secret: new_id(),
        };
        self.identities.write().insert(identity.id.clone(), identity.clone());
        self.keys.write().insert(key.id.clone(), key.clone());
        debug!(identity = %identity.id, key = %key.id, "identity created");
        Ok((identity, key))
    }

    /// Returns an identity by id.
    pub fn identity(&self, id: &str) -> Option<Identity> {
        self.identities.read().get(id).cloned()
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns true if no entity is stored.
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Drops every entity, identity and key.
    pub fn clear(&self) {
        self.entities.write().clear();
        self.identities.write().clear();
        self.keys.write().clear();
    }
}

impl KeyValidator for LedgerStore {
    fn is_valid(&self, key_id: &str, secret: &str) -> bool {
        self.keys.read().get(key_id).is_some_and(|key| key.secret == secret)
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn not_found(kind: EntityKind, id: &str) -> ServerError {
    ServerError::NotFound(format!("{kind} {id}"))
}

fn read_details(kind: EntityKind, body: &Value) -> ServerResult<Details> {
    match kind {
        EntityKind::Organization | EntityKind::Book => Ok(Details::None),
        EntityKind::Account => Ok(Details::Account {
            normal_balance: NormalBalance::parse(str_field(body, "normal_balance")?)?,
        }),
        EntityKind::JournalEntry => {
            let effective_at = parse_timestamp("effective_at", str_field(body, "effective_at")?)?;
            let raw = body.get("lines").cloned().unwrap_or(Value::Null);
            let lines = serde_json::from_value(raw)
                .map_err(|e| ServerError::InvalidRequest(format!("invalid lines: {e}")))?;
            Ok(Details::Entry { effective_at, lines })
        }
    }
}

fn check_parent(entities: &HashMap<String, StoredEntity>, kind: EntityKind, ancestors: &Ancestors) -> ServerResult<()> {
    let (parent_kind, parent_id, parent_ancestors) = match kind {
        EntityKind::Organization => return Ok(()),
        EntityKind::Book => (EntityKind::Organization, ancestors.org.as_deref(), Ancestors::none()),
        EntityKind::Account | EntityKind::JournalEntry => (
            EntityKind::Book,
            ancestors.book.as_deref(),
            Ancestors {
                org: ancestors.org.clone(),
                book: None,
            },
        ),
    };
    let parent_id = parent_id.unwrap_or_default();
    let exists = entities
        .get(parent_id)
        .is_some_and(|parent| parent.kind == parent_kind && parent.ancestors == parent_ancestors);
    if exists {
        Ok(())
    } else {
        Err(not_found(parent_kind, parent_id))
    }
}

fn check_lines(entities: &HashMap<String, StoredEntity>, ancestors: &Ancestors, lines: &[Line]) -> ServerResult<()> {
    let (mut debit, mut credit) = (0i128, 0i128);
    for line in lines {
        let known = entities
            .get(&line.account_id)
            .is_some_and(|account| account.kind == EntityKind::Account && account.ancestors == *ancestors);
        if !known {
            return Err(ServerError::InvalidRequest(format!("unknown account {}", line.account_id)));
        }
        let units = to_units(&line.value.amount)?;
        match line.value.side {
            LineSide::Debit => debit = checked(debit.checked_add(units))?,
            LineSide::Credit => credit = checked(credit.checked_add(units))?,
        }
    }
    if debit != credit {
        return Err(ServerError::InvalidRequest(format!(
            "journal entry does not balance: debits {} credits {}",
            format_units(debit),
            format_units(credit)
        )));
    }
    Ok(())
}

fn checked(units: Option<i128>) -> ServerResult<i128> {
    units.ok_or_else(|| ServerError::InvalidRequest("amount out of range".into()))
}

fn to_units(amount: &Amount) -> ServerResult<i128> {
    let raw = amount.as_str();
    let (int, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if frac.len() > SCALE as usize {
        return Err(ServerError::InvalidRequest(format!(
            "amount {raw} has more than {SCALE} decimal places"
        )));
    }
    let int: i128 = int
        .parse()
        .map_err(|_| ServerError::InvalidRequest(format!("amount {raw} out of range")))?;
    let frac: i128 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<width$}", width = SCALE as usize)
            .parse()
            .map_err(|_| ServerError::InvalidRequest(format!("invalid amount {raw}")))?
    };
    checked(int.checked_mul(10i128.pow(SCALE)).and_then(|units| units.checked_add(frac)))
}

fn format_units(units: i128) -> String {
    let scale = 10i128.pow(SCALE);
    let (int, frac) = (units / scale, units % scale);
    if frac == 0 {
        int.to_string()
    } else {
        let frac = format!("{frac:0width$}", width = SCALE as usize);
        format!("{int}.{}", frac.trim_end_matches('0'))
    }
}

fn balance_value(kind: ValueType, units: i128) -> ServerResult<BalanceValue> {
    let amount = Amount::new(format_units(units)).map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(BalanceValue { kind, amount })
}
