use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, Weak};

use crate::{
    BindingId, ObservationId,
    context::FanoutGuard,
    diagnostics::{self, Violation},
    observation,
};

/// The fan-out table of one binding.
///
/// Observations are held weakly and delivered to in registration order. The table never
/// keeps an observation alive: observations own their upstream binding, and a binding only
/// points back down at its observations weakly, so the graph has no strong cycles.
pub(crate) struct Broadcast<T>(Arc<Inner<T>>);

struct Inner<T> {
    id: BindingId,
    // ObservationIds are handed out in increasing order, so key order is registration order
    observations: RwLock<BTreeMap<ObservationId, Weak<observation::Inner<T>>>>,
    #[cfg(feature = "tokio")]
    publishers: RwLock<BTreeMap<usize, tokio::sync::mpsc::UnboundedSender<T>>>,
    #[cfg(feature = "tokio")]
    next_publisher: std::sync::atomic::AtomicUsize,
}

/// A reference to a broadcast that does not keep it alive
pub(crate) struct WeakBroadcast<T>(Weak<Inner<T>>);

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> std::fmt::Debug for Broadcast<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcast")
            .field("id", &self.0.id)
            .field("observations", &self.0.observations.read().expect("observations lock is poisoned").len())
            .finish()
    }
}

impl<T> Broadcast<T> {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            id: BindingId::next(),
            observations: RwLock::new(BTreeMap::new()),
            #[cfg(feature = "tokio")]
            publishers: RwLock::new(BTreeMap::new()),
            #[cfg(feature = "tokio")]
            next_publisher: std::sync::atomic::AtomicUsize::new(0),
        }))
    }

    /// Identity of the binding that owns this broadcast
    pub fn id(&self) -> BindingId { self.0.id }

    pub fn downgrade(&self) -> WeakBroadcast<T> { WeakBroadcast(Arc::downgrade(&self.0)) }

    pub fn register(&self, id: ObservationId, observation: Weak<observation::Inner<T>>) {
        self.0.observations.write().expect("observations lock is poisoned").insert(id, observation);
    }

    /// Remove a registration. Returns false if there was nothing to remove.
    pub fn unregister(&self, id: ObservationId) -> bool {
        // the removed Weak is dropped after the lock is released
        let removed = self.0.observations.write().expect("observations lock is poisoned").remove(&id);
        removed.is_some()
    }

    /// Number of registered observations that are still alive
    pub fn live_observations(&self) -> usize {
        self.0.observations.read().expect("observations lock is poisoned").values().filter(|weak| weak.strong_count() > 0).count()
    }
}

impl<T> Broadcast<T>
where T: Clone + Send + Sync + 'static
{
    /// Deliver `value` to every live, unpaused observation, then to bridged publishers.
    ///
    /// Re-entering the fan-out of the same binding on the same thread is a binding loop: it
    /// is reported and the nested delivery is skipped.
    pub fn notify(&self, value: T) {
        let Some(_guard) = FanoutGuard::enter(self.0.id) else {
            diagnostics::report(Violation::BindingLoop { binding: self.0.id });
            return;
        };

        // Snapshot the live observations so that callbacks are free to register, cancel or
        // drop observations (including themselves) without holding our lock.
        let live = {
            let mut observations = self.0.observations.write().expect("observations lock is poisoned");
            let mut live = Vec::with_capacity(observations.len());
            observations.retain(|_, weak| match weak.upgrade() {
                Some(observation) => {
                    live.push(observation);
                    true
                }
                None => false,
            });
            live
        };

        for observation in live {
            observation.deliver(value.clone());
        }

        #[cfg(feature = "tokio")]
        self.publish(value);
    }

    #[cfg(feature = "tokio")]
    fn publish(&self, value: T) {
        let mut publishers = self.0.publishers.write().expect("publishers lock is poisoned");
        // a failed send means the receiving Publisher is gone
        publishers.retain(|_, sender| sender.send(value.clone()).is_ok());
    }

    /// Attach a publisher channel. `current` is sent before any later change can be.
    #[cfg(feature = "tokio")]
    pub fn attach_publisher(&self, sender: tokio::sync::mpsc::UnboundedSender<T>, current: T) -> usize {
        let id = self.0.next_publisher.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let mut publishers = self.0.publishers.write().expect("publishers lock is poisoned");
        if sender.send(current).is_ok() {
            publishers.insert(id, sender);
        }
        id
    }
}

impl<T> WeakBroadcast<T> {
    #[cfg(feature = "tokio")]
    pub fn detach_publisher(&self, id: usize) {
        if let Some(inner) = self.0.upgrade() {
            inner.publishers.write().expect("publishers lock is poisoned").remove(&id);
        }
    }
}
