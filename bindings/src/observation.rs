use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::{
    Binding, BindingId, Callback, ObservationStorage, StorageKey,
    broadcast::Broadcast,
    diagnostics::{self, Violation},
    storage,
};

/// Process-unique identity of an observation. Ids increase in creation order.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObservationId(usize);

impl ObservationId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ObservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "O-{}", self.0) }
}

/// A cancellable registration of a callback with one upstream binding.
///
/// Holding an observation keeps its upstream binding (and with it the whole chain above)
/// alive. The binding only refers back to the observation weakly, so once the last handle
/// is dropped (including any copies held by an [`ObservationStorage`]) the registration is
/// gone. Cloning an `Observation` clones the handle, not the registration.
///
/// States: active, paused (deliveries are skipped, the registration stays), and canceled
/// (terminal). Cancel is idempotent.
pub struct Observation<T>(pub(crate) Arc<Inner<T>>);

pub(crate) struct Inner<T> {
    id: ObservationId,
    callback: Callback<T>,
    /// fan-out table we are registered with
    broadcast: Broadcast<T>,
    paused: AtomicBool,
    canceled: AtomicBool,
    state: Mutex<State<T>>,
}

struct State<T> {
    /// Strong reference to the observed binding; released on cancel
    upstream: Option<Arc<dyn Binding<T>>>,
    /// Storages currently holding this observation
    storages: Vec<Weak<storage::Inner>>,
}

impl<T> Clone for Observation<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> std::fmt::Debug for Observation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observation")
            .field("id", &self.0.id)
            .field("binding", &self.0.broadcast.id())
            .field("paused", &self.is_paused())
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

impl<T> PartialEq for Observation<T> {
    fn eq(&self, other: &Self) -> bool { self.0.id == other.0.id }
}

impl<T> Eq for Observation<T> {}

impl<T> std::hash::Hash for Observation<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { self.0.id.hash(state) }
}

impl<T> Observation<T> {
    pub fn id(&self) -> ObservationId { self.0.id }

    /// Identity of the observed binding
    pub fn binding_id(&self) -> BindingId { self.0.broadcast.id() }

    /// Stop delivering values until [`resume`](Self::resume). Values changed in the
    /// meantime are not replayed.
    pub fn pause(&self) { self.0.paused.store(true, Ordering::SeqCst); }

    pub fn resume(&self) { self.0.paused.store(false, Ordering::SeqCst); }

    pub fn is_paused(&self) -> bool { self.0.paused.load(Ordering::SeqCst) }

    pub fn is_canceled(&self) -> bool { self.0.canceled.load(Ordering::SeqCst) }
}

impl<T> Observation<T>
where T: Clone + Send + Sync + 'static
{
    /// Create an observation and register it with `broadcast`.
    pub(crate) fn register(broadcast: &Broadcast<T>, upstream: Arc<dyn Binding<T>>, callback: Callback<T>) -> Self {
        let inner = Arc::new(Inner {
            id: ObservationId::next(),
            callback,
            broadcast: broadcast.clone(),
            paused: AtomicBool::new(false),
            canceled: AtomicBool::new(false),
            state: Mutex::new(State { upstream: Some(upstream), storages: Vec::new() }),
        });
        broadcast.register(inner.id, Arc::downgrade(&inner));
        Self(inner)
    }

    /// End the registration.
    ///
    /// Unregisters from the upstream binding, evicts this observation from every storage
    /// holding it, and releases the upstream binding. Calling it again does nothing.
    pub fn cancel(&self) { self.0.cancel(); }

    /// Like [`cancel`](Self::cancel), but reports [`Violation::AlreadyCanceled`] if the
    /// observation was already canceled.
    pub fn cancel_checked(&self) {
        if !self.0.cancel() {
            diagnostics::report(Violation::AlreadyCanceled { observation: self.0.id });
        }
    }

    /// Hand ownership of this observation to `storage`, keyed by the observation's identity.
    pub fn store_in(&self, storage: &ObservationStorage) { storage.store(self); }

    /// Hand ownership of this observation to `storage` under an explicit key.
    pub fn store_in_for(&self, storage: &ObservationStorage, key: impl Into<StorageKey>) { storage.store_for(key, self); }
}

impl<T> Inner<T>
where T: Clone + Send + Sync + 'static
{
    /// Invoke the callback unless paused or canceled.
    pub(crate) fn deliver(self: &Arc<Self>, value: T) {
        // checked per delivery: an earlier callback in the same fan-out may have paused or
        // canceled us after the snapshot was taken
        if self.paused.load(Ordering::SeqCst) || self.canceled.load(Ordering::SeqCst) {
            return;
        }
        let handle = Observation(self.clone());
        (self.callback)(value, &handle);
    }

    /// Returns true if this call performed the cancellation.
    fn cancel(&self) -> bool {
        if self.canceled.swap(true, Ordering::SeqCst) {
            return false;
        }

        if !self.broadcast.unregister(self.id) {
            diagnostics::report(Violation::MissingRegistration { binding: self.broadcast.id(), observation: self.id });
        }

        let (storages, upstream) = {
            let mut state = self.state.lock().expect("observation state lock is poisoned");
            (std::mem::take(&mut state.storages), state.upstream.take())
        };

        for storage in storages.iter().filter_map(Weak::upgrade) {
            // evicted entries are dropped here, outside the storage lock
            let _evicted = storage.evict(self.id);
        }

        tracing::trace!(observation = %self.id, binding = %self.broadcast.id(), "observation canceled");
        // releasing the upstream may release a whole chain of derived bindings
        drop(upstream);
        true
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if !self.canceled.load(Ordering::SeqCst) {
            self.broadcast.unregister(self.id);
        }
    }
}

/// Type-erased view of an observation, as held by an [`ObservationStorage`].
pub(crate) trait AnyObservation: Send + Sync {
    fn observation_id(&self) -> ObservationId;

    fn cancel(&self);

    fn track_storage(&self, storage: Weak<storage::Inner>);

    fn forget_storage(&self, storage: &Weak<storage::Inner>);
}

impl<T> AnyObservation for Inner<T>
where T: Clone + Send + Sync + 'static
{
    fn observation_id(&self) -> ObservationId { self.id }

    fn cancel(&self) { Inner::cancel(self); }

    fn track_storage(&self, storage: Weak<storage::Inner>) {
        let mut state = self.state.lock().expect("observation state lock is poisoned");
        state.storages.retain(|existing| existing.strong_count() > 0);
        if !state.storages.iter().any(|existing| existing.ptr_eq(&storage)) {
            state.storages.push(storage);
        }
    }

    fn forget_storage(&self, storage: &Weak<storage::Inner>) {
        let mut state = self.state.lock().expect("observation state lock is poisoned");
        state.storages.retain(|existing| existing.strong_count() > 0 && !existing.ptr_eq(storage));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BindingExt, Source};

    #[test]
    fn ids_increase_in_creation_order() {
        let source = Source::new(());
        let first = source.observe(|_, _| {});
        let second = source.observe(|_, _| {});
        assert!(first.id() < second.id());
        assert_eq!(first.binding_id(), source.id());
    }

    #[test]
    fn cancel_releases_upstream() {
        let source = Source::new(1);
        let weak = source.downgrade();
        let observation = source.observe(|_, _| {});
        drop(source);

        // the observation is now the only owner
        assert!(weak.upgrade().is_some());
        observation.cancel();
        assert!(weak.upgrade().is_none());
        assert!(observation.is_canceled());
    }

    #[test]
    fn clones_share_the_registration() {
        let source = Source::new(1);
        let observation = source.observe(|_, _| {});
        let copy = observation.clone();
        assert_eq!(observation, copy);

        copy.cancel();
        assert!(observation.is_canceled());
        assert_eq!(source.live_observations(), 0);
    }
}
