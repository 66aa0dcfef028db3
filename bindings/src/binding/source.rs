use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::{Binding, BindingId, Callback, Observation, broadcast::Broadcast};
#[cfg(feature = "tokio")]
use crate::porcelain::Publisher;

/// The source of truth of a binding graph.
///
/// Holds its value either in its own storage ([`Source::new`]) or behind external
/// accessors ([`Source::with_accessors`]). Setting a value notifies every observation
/// synchronously before `set` returns. Writes made while paused are dropped, not queued.
///
/// Cloning a `Source` clones the handle; all clones are the same binding.
pub struct Source<T>(Arc<Inner<T>>);

/// A `Source` reference that does not keep the binding alive
pub struct WeakSource<T>(Weak<Inner<T>>);

struct Inner<T> {
    store: Store<T>,
    paused: AtomicBool,
    broadcast: Broadcast<T>,
}

type Getter<T> = Box<dyn Fn() -> T + Send + Sync>;
type Setter<T> = Box<dyn Fn(T) + Send + Sync>;

enum Store<T> {
    Owned(RwLock<T>),
    Accessors { get: Getter<T>, set: Setter<T> },
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> Clone for WeakSource<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl_identity!(Source<T>);

impl<T> std::fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source").field("id", &self.id()).field("paused", &self.is_paused()).finish()
    }
}

impl<T> Source<T> {
    pub fn id(&self) -> BindingId { self.0.broadcast.id() }

    /// Drop all writes until [`resume`](Self::resume).
    pub fn pause(&self) { self.0.paused.store(true, Ordering::SeqCst); }

    /// Accept writes again. Writes dropped while paused are not replayed.
    pub fn resume(&self) { self.0.paused.store(false, Ordering::SeqCst); }

    pub fn is_paused(&self) -> bool { self.0.paused.load(Ordering::SeqCst) }

    /// Number of live observations registered with this source
    pub fn live_observations(&self) -> usize { self.0.broadcast.live_observations() }

    pub fn downgrade(&self) -> WeakSource<T> { WeakSource(Arc::downgrade(&self.0)) }
}

impl<T> WeakSource<T> {
    pub fn upgrade(&self) -> Option<Source<T>> { self.0.upgrade().map(Source) }
}

impl<T> Source<T>
where T: Clone + Send + Sync + 'static
{
    pub fn new(value: T) -> Self {
        Self(Arc::new(Inner { store: Store::Owned(RwLock::new(value)), paused: AtomicBool::new(false), broadcast: Broadcast::new() }))
    }

    /// A source whose value lives elsewhere. `get` is called on every read, `set` on every
    /// accepted write (before observations are notified).
    pub fn with_accessors<G, S>(get: G, set: S) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        Self(Arc::new(Inner {
            store: Store::Accessors { get: Box::new(get), set: Box::new(set) },
            paused: AtomicBool::new(false),
            broadcast: Broadcast::new(),
        }))
    }

    /// Store `value` and notify observations, unless paused.
    pub fn set(&self, value: T) {
        if self.is_paused() {
            tracing::trace!(binding = %self.id(), "source is paused; dropping write");
            return;
        }
        match &self.0.store {
            Store::Owned(current) => *current.write().expect("source value lock is poisoned") = value.clone(),
            Store::Accessors { set, .. } => set(value.clone()),
        }
        self.0.broadcast.notify(value);
    }

    /// Calls a closure with a borrow of the current value.
    ///
    /// The closure must not write to this same source.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match &self.0.store {
            Store::Owned(current) => f(&*current.read().expect("source value lock is poisoned")),
            Store::Accessors { get, .. } => f(&get()),
        }
    }

    /// Replace the value with one computed from the current value.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.with(f);
        self.set(next);
    }

    /// A read-only handle to this source
    pub fn read_only(&self) -> Arc<dyn Binding<T>> { Arc::new(self.clone()) }
}

impl<T> Binding<T> for Source<T>
where T: Clone + Send + Sync + 'static
{
    fn binding_id(&self) -> BindingId { self.id() }

    fn value(&self) -> T { self.with(T::clone) }

    fn observe_with(&self, callback: Callback<T>) -> Observation<T> {
        Observation::register(&self.0.broadcast, Arc::new(self.clone()), callback)
    }

    #[cfg(feature = "tokio")]
    fn publisher(&self) -> Publisher<T> { Publisher::attach(&self.0.broadcast, Arc::new(self.clone()), self.value()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BindingExt;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[test]
    fn set_then_read() {
        let source = Source::new("a".to_string());
        source.set("b".to_string());
        assert_eq!(source.value(), "b");
        assert_eq!(source.with(|value| value.len()), 1);
    }

    #[test]
    fn paused_writes_are_dropped_not_replayed() {
        let source = Source::new(1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _observation = {
            let seen = seen.clone();
            source.observe(move |value, _| seen.lock().unwrap().push(value))
        };

        source.pause();
        source.set(2);
        assert_eq!(source.value(), 1);

        source.resume();
        assert!(seen.lock().unwrap().is_empty());

        source.set(3);
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[test]
    fn accessors_back_the_value() {
        let backing = Arc::new(Mutex::new(10));
        let source = {
            let get_backing = backing.clone();
            let set_backing = backing.clone();
            Source::with_accessors(move || *get_backing.lock().unwrap(), move |value| *set_backing.lock().unwrap() = value)
        };

        assert_eq!(source.value(), 10);
        source.set(11);
        assert_eq!(*backing.lock().unwrap(), 11);

        // changes made behind the source's back are visible, but not observed
        *backing.lock().unwrap() = 12;
        assert_eq!(source.value(), 12);
    }

    #[test]
    fn update_reads_then_writes() {
        let source = Source::new(2);
        source.update(|value| value * 21);
        assert_eq!(source.value(), 42);
    }

    #[test]
    fn identity_equality_and_hashing() {
        let a = Source::new(1);
        let b = Source::new(1);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);

        let set: HashSet<_> = [a.clone(), a.clone(), b.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
