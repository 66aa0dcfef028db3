use std::sync::Arc;
use std::time::Duration;

use crate::{
    Binding, Combined, Immediate, Observation, Transformed, callback,
    queue::{Clock, Queue, SystemClock},
    transform::{Delay, LeadingDebounce, Map, ReceiveOn, RemoveDuplicates, Throttle, TrailingDebounce},
};

/// Observation and composition operators, available on every cloneable binding.
///
/// Every operator returns a new binding that holds its upstream strongly. Derived bindings
/// built with the transform operators stay lazy until observed.
pub trait BindingExt<T>: Binding<T> + Clone + Sized + 'static
where T: Clone + Send + Sync + 'static
{
    /// Register a closure for future changes. It is not called with the current value; see
    /// [`immediate`](Self::immediate) for that.
    fn observe<F>(&self, f: F) -> Observation<T>
    where F: Fn(T, &Observation<T>) + Send + Sync + 'static {
        self.observe_with(callback(f))
    }

    /// Erase the concrete binding type
    fn boxed(&self) -> Arc<dyn Binding<T>> { Arc::new(self.clone()) }

    fn map<U, F>(&self, f: F) -> Transformed<T, U, Map<F>>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Transformed::new(self.boxed(), Map::new(f))
    }

    /// Skip changes equal to the last emitted value.
    fn remove_duplicates(&self) -> Transformed<T, T, RemoveDuplicates<T, fn(&T, &T) -> bool>>
    where T: PartialEq {
        Transformed::new(self.boxed(), RemoveDuplicates::equal())
    }

    /// Skip changes for which `is_duplicate(last_emitted, new)` holds.
    fn remove_duplicates_by<P>(&self, is_duplicate: P) -> Transformed<T, T, RemoveDuplicates<T, P>>
    where P: Fn(&T, &T) -> bool + Send + Sync + 'static {
        Transformed::new(self.boxed(), RemoveDuplicates::new(is_duplicate))
    }

    fn receive_on<Q: Queue>(&self, queue: Q, always_async: bool) -> Transformed<T, T, ReceiveOn> {
        Transformed::new(self.boxed(), ReceiveOn::new(Arc::new(queue), always_async))
    }

    /// Emit each change `interval` later on `queue`. A zero interval still hops onto the queue.
    fn delay<Q: Queue>(&self, interval: Duration, queue: Q) -> Transformed<T, T, Delay> {
        Transformed::new(self.boxed(), Delay::new(interval, Arc::new(queue)))
    }

    fn leading_debounce(&self, interval: Duration) -> Transformed<T, T, LeadingDebounce> {
        self.leading_debounce_with_clock(interval, SystemClock)
    }

    fn leading_debounce_with_clock<C: Clock>(&self, interval: Duration, clock: C) -> Transformed<T, T, LeadingDebounce> {
        Transformed::new(self.boxed(), LeadingDebounce::new(interval, Arc::new(clock)))
    }

    fn trailing_debounce<Q: Queue>(&self, interval: Duration, queue: Q) -> Transformed<T, T, TrailingDebounce> {
        Transformed::new(self.boxed(), TrailingDebounce::new(interval, Arc::new(queue)))
    }

    /// See [`Throttle`] for the window rules.
    fn throttle<Q: Queue>(&self, interval: Duration, latest: bool, invoke_immediately: bool, queue: Q) -> Transformed<T, T, Throttle<T>> {
        Transformed::new(self.boxed(), Throttle::new(interval, latest, invoke_immediately, Arc::new(queue)))
    }

    fn combine<U, B>(&self, other: &B) -> Combined<T, U>
    where
        U: Clone + Send + Sync + 'static,
        B: BindingExt<U>,
    {
        Combined::new(self.boxed(), other.boxed())
    }

    /// Deliver the current value to each new observation as it is created.
    fn immediate(&self) -> Immediate<T> { Immediate::new(self.boxed()) }
}

impl<T, B> BindingExt<T> for B
where
    B: Binding<T> + Clone + 'static,
    T: Clone + Send + Sync + 'static,
{
}
