//! Identity registry.
//!
//! Maps remote ids to the single in-memory instance representing them.
//! Concurrent lookups of the same id are serialized on a per-id slot so
//! the factory runs at most once; lookups of different ids never wait on
//! each other's fetches.
//!
//! Lock order is slot, then map. The map lock is never held while waiting
//! on a slot.

use crate::error::{ClientError, ClientResult};
use crate::model::{AnyResource, Model, Resource};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use subledger_protocol::snapshot_id;
use tracing::{debug, trace, warn};

type Slot = Arc<Mutex<Option<AnyResource>>>;

/// Process-wide id to instance map.
///
/// Entries live until evicted or the registry is cleared; there is no
/// automatic expiry.
#[derive(Debug, Default)]
pub struct Registry {
    slots: Mutex<HashMap<String, Slot>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached instance for `id`, or builds, caches and returns
    /// the one produced by `factory`.
    ///
    /// While `factory` runs, other lookups of the same id wait. If it fails
    /// nothing is cached and a later lookup tries again.
    pub fn lookup_or_insert<M, F>(&self, id: &str, factory: F) -> ClientResult<Resource<M>>
    where
        M: Model,
        F: FnOnce() -> ClientResult<Resource<M>>,
    {
        self.with_slot(id, |entry| {
            if let Some(existing) = entry.as_ref() {
                trace!(id, kind = %M::KIND, "registry hit");
                return M::from_any(existing).ok_or_else(|| ClientError::KindMismatch {
                    id: id.to_string(),
                    expected: M::KIND,
                    found: existing.kind(),
                });
            }

            let resource = factory()?;
            match resource.id() {
                Some(returned) if returned == id => {}
                returned => {
                    return Err(ClientError::IdentityMismatch {
                        requested: id.to_string(),
                        returned: returned.unwrap_or_default(),
                    })
                }
            }
            debug!(id, kind = %M::KIND, "registry insert");
            *entry = Some(M::into_any(resource.clone()));
            Ok(resource)
        })
    }

    /// Resolves a snapshot: through the registry if it carries an id,
    /// otherwise by building an uncached instance.
    pub fn lookup_or_insert_from_snapshot<M, F>(&self, snapshot: &Value, build: F) -> ClientResult<Resource<M>>
    where
        M: Model,
        F: FnOnce() -> ClientResult<Resource<M>>,
    {
        match snapshot_id(snapshot)? {
            Some(id) => self.lookup_or_insert(&id, build),
            None => build(),
        }
    }

    /// Records a freshly persisted instance under its id.
    ///
    /// If another instance is already cached under the id, the new one
    /// replaces it.
    pub fn register<M: Model>(&self, resource: &Resource<M>) -> ClientResult<()> {
        let id = resource.id().ok_or(ClientError::NotPersisted { kind: M::KIND })?;
        self.register_with(&id, resource, || {})
    }

    /// Registers `resource` under `id`, running `apply` once the kind check
    /// has passed and before the instance becomes visible.
    ///
    /// On a kind mismatch `apply` never runs.
    pub(crate) fn register_with<M: Model, F: FnOnce()>(
        &self,
        id: &str,
        resource: &Resource<M>,
        apply: F,
    ) -> ClientResult<()> {
        self.with_slot(id, |entry| {
            if let Some(existing) = entry.as_ref() {
                match M::from_any(existing) {
                    None => {
                        return Err(ClientError::KindMismatch {
                            id: id.to_string(),
                            expected: M::KIND,
                            found: existing.kind(),
                        })
                    }
                    Some(cached) if cached.ptr_eq(resource) => {
                        apply();
                        return Ok(());
                    }
                    Some(_) => warn!(id = %id, kind = %M::KIND, "replacing cached instance"),
                }
            }
            apply();
            *entry = Some(M::into_any(resource.clone()));
            Ok(())
        })
    }

    /// Returns the cached instance for `id`, if any, without fetching.
    pub fn get<M: Model>(&self, id: &str) -> ClientResult<Option<Resource<M>>> {
        self.with_slot(id, |entry| match entry.as_ref() {
            None => Ok(None),
            Some(existing) => M::from_any(existing).map(Some).ok_or_else(|| ClientError::KindMismatch {
                id: id.to_string(),
                expected: M::KIND,
                found: existing.kind(),
            }),
        })
    }

    /// True if an instance is cached under `id`.
    pub fn contains(&self, id: &str) -> bool {
        let slot = self.slots.lock().get(id).cloned();
        slot.is_some_and(|slot| slot.lock().is_some())
    }

    /// Drops the instance cached under `id`. Returns true if there was one.
    ///
    /// Handles already given out stay valid; the next lookup fetches anew.
    pub fn evict(&self, id: &str) -> bool {
        self.with_slot(id, |entry| entry.take().is_some())
    }

    /// Number of cached instances.
    pub fn len(&self) -> usize {
        self.snapshot().iter().filter(|slot| slot.lock().is_some()).count()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all cached instances, in no particular order.
    pub fn ids(&self) -> Vec<String> {
        let entries: Vec<(String, Slot)> = self
            .slots
            .lock()
            .iter()
            .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
            .collect();
        entries
            .into_iter()
            .filter(|(_, slot)| slot.lock().is_some())
            .map(|(id, _)| id)
            .collect()
    }

    /// Drops every cached instance.
    pub fn clear(&self) {
        for slot in self.snapshot() {
            slot.lock().take();
        }
    }

    fn snapshot(&self) -> Vec<Slot> {
        self.slots.lock().values().cloned().collect()
    }

    /// Runs `f` with exclusive access to the entry for `id`.
    ///
    /// A slot left empty afterwards is removed from the map.
    fn with_slot<R>(&self, id: &str, f: impl FnOnce(&mut Option<AnyResource>) -> R) -> R {
        loop {
            let slot = Arc::clone(
                self.slots
                    .lock()
                    .entry(id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(None))),
            );
            let mut entry = slot.lock();

            // The slot may have been dropped from the map while we waited.
            let current = self
                .slots
                .lock()
                .get(id)
                .is_some_and(|mapped| Arc::ptr_eq(mapped, &slot));
            if !current {
                continue;
            }

            let result = f(&mut entry);
            if entry.is_none() {
                let mut slots = self.slots.lock();
                if slots.get(id).is_some_and(|mapped| Arc::ptr_eq(mapped, &slot)) {
                    slots.remove(id);
                }
            }
            return result;
        }
    }
}
