use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::{
    Observation, ObservationId,
    diagnostics::{self, Violation},
    observation::AnyObservation,
};

/// Key of an entry in an [`ObservationStorage`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKey {
    /// Keyed by the observation's own identity
    Observation(ObservationId),
    /// Keyed by a caller-chosen name
    Named(String),
}

impl From<ObservationId> for StorageKey {
    fn from(id: ObservationId) -> Self { StorageKey::Observation(id) }
}

impl From<&str> for StorageKey {
    fn from(name: &str) -> Self { StorageKey::Named(name.to_string()) }
}

impl From<String> for StorageKey {
    fn from(name: String) -> Self { StorageKey::Named(name) }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageKey::Observation(id) => write!(f, "{id}"),
            StorageKey::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Owns observations on behalf of whoever owns the storage, so callers don't have to keep
/// every observation handle around themselves.
///
/// Removing an observation from a storage only releases the storage's reference; it does
/// not cancel the observation, which may be held elsewhere. Canceling an observation
/// evicts it from every storage holding it. Cloning a storage clones the handle.
#[derive(Clone, Default)]
pub struct ObservationStorage(Arc<Inner>);

#[derive(Default)]
pub(crate) struct Inner {
    entries: RwLock<BTreeMap<StorageKey, Arc<dyn AnyObservation>>>,
}

impl std::fmt::Debug for ObservationStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationStorage").field("entries", &self.len()).finish()
    }
}

impl ObservationStorage {
    pub fn new() -> Self { Self::default() }

    /// Store `observation` under its own identity.
    pub fn store<T>(&self, observation: &Observation<T>)
    where T: Clone + Send + Sync + 'static {
        self.store_for(StorageKey::Observation(observation.id()), observation);
    }

    /// Store `observation` under `key`, replacing whatever was stored there.
    pub fn store_for<T>(&self, key: impl Into<StorageKey>, observation: &Observation<T>)
    where T: Clone + Send + Sync + 'static {
        let key = key.into();
        if observation.is_canceled() {
            tracing::debug!(observation = %observation.id(), %key, "not storing a canceled observation");
            return;
        }

        let entry: Arc<dyn AnyObservation> = observation.0.clone();
        let replaced = self.0.entries.write().expect("storage lock is poisoned").insert(key, entry);
        observation.0.track_storage(Arc::downgrade(&self.0));

        if let Some(replaced) = replaced {
            let replaced_id = replaced.observation_id();
            if replaced_id != observation.id() && !self.0.holds(replaced_id) {
                replaced.forget_storage(&Arc::downgrade(&self.0));
            }
            // dropping `replaced` may end its registration; no lock is held here
        }
    }

    /// Release every entry holding `observation`, without canceling it.
    pub fn remove<T>(&self, observation: &Observation<T>)
    where T: Clone + Send + Sync + 'static {
        let evicted = self.0.evict(observation.id());
        if evicted.is_empty() {
            diagnostics::report(Violation::MissingStorageEntry { key: StorageKey::Observation(observation.id()) });
            return;
        }
        observation.0.forget_storage(&Arc::downgrade(&self.0));
    }

    /// Release the entry stored under `key`, without canceling it.
    pub fn remove_for(&self, key: impl Into<StorageKey>) {
        let key = key.into();
        let removed = self.0.entries.write().expect("storage lock is poisoned").remove(&key);
        match removed {
            Some(observation) => {
                if !self.0.holds(observation.observation_id()) {
                    observation.forget_storage(&Arc::downgrade(&self.0));
                }
            }
            None => diagnostics::report(Violation::MissingStorageEntry { key }),
        }
    }

    pub fn contains<T>(&self, observation: &Observation<T>) -> bool { self.0.holds(observation.id()) }

    pub fn contains_key(&self, key: impl Into<StorageKey>) -> bool {
        self.0.entries.read().expect("storage lock is poisoned").contains_key(&key.into())
    }

    /// Release every entry without canceling anything.
    pub fn remove_all(&self) {
        let entries = std::mem::take(&mut *self.0.entries.write().expect("storage lock is poisoned"));
        let this = Arc::downgrade(&self.0);
        for observation in entries.values() {
            observation.forget_storage(&this);
        }
        tracing::debug!(released = entries.len(), "observation storage cleared");
    }

    /// Cancel every stored observation. Canceling evicts each one from this storage (and any
    /// other storage holding it).
    pub fn cancel_all(&self) {
        let entries: Vec<_> = self.0.entries.read().expect("storage lock is poisoned").values().cloned().collect();
        for observation in entries {
            observation.cancel();
        }
    }

    pub fn len(&self) -> usize { self.0.entries.read().expect("storage lock is poisoned").len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Inner {
    fn holds(&self, id: ObservationId) -> bool {
        self.entries.read().expect("storage lock is poisoned").values().any(|entry| entry.observation_id() == id)
    }

    /// Remove every entry holding observation `id` and hand them back, so the caller drops
    /// them after the lock is released.
    pub(crate) fn evict(&self, id: ObservationId) -> Vec<Arc<dyn AnyObservation>> {
        let mut entries = self.entries.write().expect("storage lock is poisoned");
        let keys: Vec<StorageKey> = entries.iter().filter(|(_, entry)| entry.observation_id() == id).map(|(key, _)| key.clone()).collect();
        keys.iter().filter_map(|key| entries.remove(key)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BindingExt, Source, diagnostics::with_violation_handler};
    use std::sync::Mutex;

    fn count_violations(f: impl FnOnce()) -> Vec<Violation> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        with_violation_handler(move |violation: &Violation| sink.lock().unwrap().push(violation.clone()), f);
        let seen = seen.lock().unwrap().clone();
        seen
    }

    #[test]
    fn storage_keeps_observation_alive() {
        let source = Source::new(0);
        let hits = Arc::new(Mutex::new(Vec::new()));
        let storage = ObservationStorage::new();

        {
            let hits = hits.clone();
            source.observe(move |value, _| hits.lock().unwrap().push(value)).store_in(&storage);
        }

        source.set(1);
        assert_eq!(*hits.lock().unwrap(), vec![1]);

        drop(storage);
        source.set(2);
        assert_eq!(*hits.lock().unwrap(), vec![1]);
    }

    #[test]
    fn restoring_under_the_same_key_overwrites() {
        let source = Source::new(0);
        let storage = ObservationStorage::new();
        let first = source.observe(|_, _| {});
        let second = source.observe(|_, _| {});

        storage.store_for("slot", &first);
        storage.store_for("slot", &first);
        assert_eq!(storage.len(), 1);

        storage.store_for("slot", &second);
        assert_eq!(storage.len(), 1);
        assert!(!storage.contains(&first));
        assert!(storage.contains(&second));
        assert!(storage.contains_key("slot"));
    }

    #[test]
    fn remove_does_not_cancel() {
        let source = Source::new(0);
        let storage = ObservationStorage::new();
        let observation = source.observe(|_, _| {});
        storage.store(&observation);

        storage.remove(&observation);
        assert!(!storage.contains(&observation));
        assert!(!observation.is_canceled());
        assert_eq!(source.live_observations(), 1);
    }

    #[test]
    fn removing_a_missing_entry_is_reported() {
        let source = Source::new(0);
        let storage = ObservationStorage::new();
        let observation = source.observe(|_, _| {});

        let violations = count_violations(|| {
            storage.remove(&observation);
            storage.remove_for("nothing here");
        });
        assert_eq!(violations, vec![
            Violation::MissingStorageEntry { key: StorageKey::Observation(observation.id()) },
            Violation::MissingStorageEntry { key: StorageKey::from("nothing here") },
        ]);
    }

    #[test]
    fn cancel_all_empties_the_storage() {
        let source = Source::new(0);
        let storage = ObservationStorage::new();
        let a = source.observe(|_, _| {});
        let b = source.observe(|_, _| {});
        storage.store(&a);
        storage.store_for("b", &b);

        let violations = count_violations(|| storage.cancel_all());
        assert!(violations.is_empty());
        assert!(storage.is_empty());
        assert!(a.is_canceled() && b.is_canceled());
    }

    #[test]
    fn canceled_observations_are_not_stored() {
        let source = Source::new(0);
        let storage = ObservationStorage::new();
        let observation = source.observe(|_, _| {});
        observation.cancel();

        storage.store(&observation);
        assert!(storage.is_empty());
    }
}
