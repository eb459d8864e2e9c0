use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::{self, Debug},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use lineage_mod_protocol::{ApplyMode, OverrideKey, OwnerId, Priority};
use thiserror::Error;
use tracing::debug;

use crate::{
    entry::{EntryIdentity, OverrideEntry},
    method::HostMethod,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{handler} is already registered for {key}")]
    DuplicateEntry { key: OverrideKey, handler: String },

    #[error("{handler} does not match the signature of the overrides already registered for {key}")]
    SignatureMismatch { key: OverrideKey, handler: String },
}

/// An override as stored by the [`Registry`], tagged with the owner that registered it.
#[derive(Clone)]
pub struct RegisteredEntry {
    owner: OwnerId,
    key: OverrideKey,
    priority: Priority,
    mode: ApplyMode,
    handler: String,
    sequence: u64,
    identity: EntryIdentity,
    method: TypeId,
    entry: Arc<dyn Any + Send + Sync>,
}

impl RegisteredEntry {
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn key(&self) -> &OverrideKey {
        &self.key
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn mode(&self) -> ApplyMode {
        self.mode
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Position of this entry in registration order across the whole registry.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn typed<M: HostMethod>(&self) -> Option<&OverrideEntry<M>> {
        self.entry.downcast_ref()
    }
}

impl Debug for RegisteredEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredEntry")
            .field("owner", &self.owner)
            .field("key", &self.key)
            .field("priority", &self.priority)
            .field("mode", &self.mode)
            .field("handler", &self.handler)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Maps host methods to the overrides registered against them.
///
/// The entries for a key are always ordered by ascending priority, with ties resolved by
/// registration order. Lookups may run concurrently with each other; registration is expected
/// to happen while no intercepted calls are in flight.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<OverrideKey, Vec<RegisteredEntry>>>,
    next_sequence: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<OverrideKey, Vec<RegisteredEntry>>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<OverrideKey, Vec<RegisteredEntry>>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn register<M: HostMethod>(
        &self,
        owner: &OwnerId,
        entry: OverrideEntry<M>,
    ) -> Result<(), RegistryError> {
        let key = M::KEY;
        let mut entries = self.write();
        let existing = entries.get(&key).map(Vec::as_slice).unwrap_or_default();

        if existing.iter().any(|e| e.method != TypeId::of::<M>()) {
            return Err(RegistryError::SignatureMismatch {
                key,
                handler: entry.handler().to_owned(),
            });
        }

        if existing.iter().any(|e| e.identity == entry.identity()) {
            return Err(RegistryError::DuplicateEntry {
                key,
                handler: entry.handler().to_owned(),
            });
        }

        let registered = RegisteredEntry {
            owner: owner.clone(),
            key,
            priority: entry.priority(),
            mode: entry.mode(),
            handler: entry.handler().to_owned(),
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            identity: entry.identity(),
            method: TypeId::of::<M>(),
            entry: Arc::new(entry),
        };

        // Sequence numbers only grow, so inserting after every entry of equal priority keeps
        // ties in registration order.
        let slot = entries.entry(registered.key.clone()).or_default();
        let index = slot.partition_point(|e| e.priority <= registered.priority);

        debug!(
            %owner,
            key = %registered.key,
            handler = %registered.handler,
            priority = %registered.priority,
            index,
            "registered override"
        );

        slot.insert(index, registered);

        Ok(())
    }

    /// Removes every entry registered by `owner`, returning how many were removed.
    pub fn unregister_all(&self, owner: &OwnerId) -> usize {
        let mut entries = self.write();
        let mut removed = 0;

        entries.retain(|_, slot| {
            let before = slot.len();
            slot.retain(|e| &e.owner != owner);
            removed += before - slot.len();

            !slot.is_empty()
        });

        if removed > 0 {
            debug!(%owner, removed, "unregistered overrides");
        }

        removed
    }

    /// Removes the entries `owner` registered for a single key.
    pub fn unregister(&self, owner: &OwnerId, key: &OverrideKey) -> usize {
        let mut entries = self.write();

        let Some(slot) = entries.get_mut(key) else {
            return 0;
        };

        let before = slot.len();
        slot.retain(|e| &e.owner != owner);
        let removed = before - slot.len();

        if slot.is_empty() {
            entries.remove(key);
        }

        removed
    }

    /// The entries registered for `key` in dispatch order. Unknown keys have no entries.
    pub fn lookup(&self, key: &OverrideKey) -> Vec<RegisteredEntry> {
        self.read().get(key).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn count_for_owner(&self, owner: &OwnerId) -> usize {
        self.read()
            .values()
            .flatten()
            .filter(|e| &e.owner == owner)
            .count()
    }

    pub fn keys(&self) -> Vec<OverrideKey> {
        let mut keys: Vec<_> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Every owner with at least one registered entry.
    pub fn owners(&self) -> Vec<OwnerId> {
        let mut owners: Vec<_> = self
            .read()
            .values()
            .flatten()
            .map(|e| e.owner.clone())
            .collect();

        owners.sort();
        owners.dedup();
        owners
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.read().iter()).finish()
    }
}
