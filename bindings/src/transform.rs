//! Strategies that turn upstream changes into downstream emissions.
//!
//! A [`Transformed`](crate::Transformed) binding delegates everything about *what* to emit
//! and *when* to a [`Transformer`]. Transformers may emit synchronously, later on a
//! [`Queue`](crate::queue::Queue), or not at all.

mod debounce;
mod delay;
mod dedupe;
mod map;
mod receive;
mod throttle;

pub use debounce::*;
pub use delay::*;
pub use dedupe::*;
pub use map::*;
pub use receive::*;
pub use throttle::*;

use std::sync::{Arc, RwLock, Weak};

use crate::{BindingId, broadcast::Broadcast};

/// Computes a derived binding's value from its upstream.
pub trait Transformer<S, T>: Send + Sync + 'static {
    /// The derived value for an upstream value, used before (and when) the derived binding
    /// subscribes to its upstream.
    fn initial_value(&self, upstream: S) -> T;

    /// React to an upstream change. Zero or more values may be emitted, now or later.
    fn on_upstream_change(&self, value: S, emitter: &Emitter<T>);
}

/// Writes into a derived binding.
///
/// Holds the binding weakly: emitting after the binding has been released (for example
/// from a timer that was already scheduled) does nothing.
pub struct Emitter<T>(Weak<Slot<T>>);

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> Emitter<T>
where T: Clone + Send + Sync + 'static
{
    pub(crate) fn new(slot: &Arc<Slot<T>>) -> Self { Self(Arc::downgrade(slot)) }

    /// Set the derived binding's value and notify its observations.
    pub fn emit(&self, value: T) {
        match self.0.upgrade() {
            Some(slot) => slot.emit(value),
            None => tracing::trace!("derived binding was released; dropping emission"),
        }
    }

    /// Whether the derived binding still exists
    pub fn is_alive(&self) -> bool { self.0.strong_count() > 0 }
}

/// The value and fan-out of a derived binding.
pub(crate) struct Slot<T> {
    value: RwLock<Option<T>>,
    broadcast: Broadcast<T>,
}

impl<T> Slot<T> {
    pub fn new(value: Option<T>) -> Self { Self { value: RwLock::new(value), broadcast: Broadcast::new() } }

    pub fn id(&self) -> BindingId { self.broadcast.id() }

    pub fn broadcast(&self) -> &Broadcast<T> { &self.broadcast }
}

impl<T> Slot<T>
where T: Clone + Send + Sync + 'static
{
    pub fn get(&self) -> Option<T> { self.value.read().expect("slot lock is poisoned").clone() }

    /// Replace the cached value without notifying
    pub fn store(&self, value: T) { *self.value.write().expect("slot lock is poisoned") = Some(value); }

    pub fn emit(&self, value: T) {
        self.store(value.clone());
        self.broadcast.notify(value);
    }
}
