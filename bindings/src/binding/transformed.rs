use std::sync::{Arc, Mutex};

#[cfg(feature = "tokio")]
use crate::porcelain::Publisher;
use crate::{
    Binding, BindingId, Callback, Observation, callback,
    transform::{Emitter, Slot, Transformer},
};

/// A binding derived from one upstream binding through a [`Transformer`].
///
/// Lazy: nothing is subscribed to the upstream until the first observation (or publisher)
/// is created. Before that, reading the value computes it from the upstream's current value.
/// Once subscribed it stays subscribed for as long as the binding lives.
pub struct Transformed<S, T, X>(Arc<Inner<S, T, X>>);

struct Inner<S, T, X> {
    upstream: Arc<dyn Binding<S>>,
    transformer: Arc<X>,
    slot: Arc<Slot<T>>,
    activation: Mutex<Activation<S>>,
}

enum Activation<S> {
    Unsubscribed,
    // held only to keep the upstream observation alive
    #[allow(dead_code)]
    Subscribed(Observation<S>),
}

impl<S, T, X> Clone for Transformed<S, T, X> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl_identity!(Transformed<S, T, X>);

impl<S: 'static, T, X> std::fmt::Debug for Transformed<S, T, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformed")
            .field("id", &self.id())
            .field("upstream", &self.0.upstream.binding_id())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

impl<S, T, X> Transformed<S, T, X> {
    pub fn id(&self) -> BindingId { self.0.slot.id() }

    /// Whether the upstream observation has been created yet
    pub fn is_subscribed(&self) -> bool {
        matches!(*self.0.activation.lock().expect("activation lock is poisoned"), Activation::Subscribed(_))
    }
}

impl<S, T, X> Transformed<S, T, X>
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    X: Transformer<S, T>,
{
    pub fn new(upstream: Arc<dyn Binding<S>>, transformer: X) -> Self {
        Self(Arc::new(Inner { upstream, transformer: Arc::new(transformer), slot: Arc::new(Slot::new(None)), activation: Mutex::new(Activation::Unsubscribed) }))
    }

    /// Subscribe to the upstream, if not subscribed already.
    pub fn activate(&self) {
        if self.is_subscribed() {
            return;
        }
        // computed without holding the activation lock, the transformer may read other bindings
        let initial = self.0.transformer.initial_value(self.0.upstream.value());

        let mut activation = self.0.activation.lock().expect("activation lock is poisoned");
        if let Activation::Subscribed(_) = *activation {
            return;
        }
        self.0.slot.store(initial);

        let transformer = self.0.transformer.clone();
        let emitter = Emitter::new(&self.0.slot);
        let observation = self.0.upstream.observe_with(callback(move |value, _: &Observation<S>| transformer.on_upstream_change(value, &emitter)));
        tracing::debug!(binding = %self.id(), upstream = %observation.binding_id(), "derived binding subscribed to its upstream");
        *activation = Activation::Subscribed(observation);
    }
}

impl<S, T, X> Binding<T> for Transformed<S, T, X>
where
    S: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    X: Transformer<S, T>,
{
    fn binding_id(&self) -> BindingId { self.id() }

    fn value(&self) -> T {
        if self.is_subscribed() {
            if let Some(value) = self.0.slot.get() {
                return value;
            }
        }
        let value = self.0.transformer.initial_value(self.0.upstream.value());
        self.0.slot.store(value.clone());
        value
    }

    fn observe_with(&self, callback: Callback<T>) -> Observation<T> {
        self.activate();
        Observation::register(self.0.slot.broadcast(), Arc::new(self.clone()), callback)
    }

    #[cfg(feature = "tokio")]
    fn publisher(&self) -> Publisher<T> {
        self.activate();
        Publisher::attach(self.0.slot.broadcast(), Arc::new(self.clone()), self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BindingExt, Source, transform::Map};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn reading_does_not_subscribe() {
        let source = Source::new(2);
        let doubled = Transformed::new(source.boxed(), Map::new(|value: i32| value * 2));

        assert_eq!(doubled.value(), 4);
        assert!(!doubled.is_subscribed());
        assert_eq!(source.live_observations(), 0);

        source.set(5);
        assert_eq!(doubled.value(), 10);
    }

    #[test]
    fn first_observe_subscribes_once() {
        let source = Source::new(1);
        let calls = Arc::new(AtomicUsize::new(0));
        let doubled = {
            let calls = calls.clone();
            source.map(move |value| {
                calls.fetch_add(1, Ordering::SeqCst);
                value * 2
            })
        };

        let _a = doubled.observe(|_, _| {});
        let _b = doubled.observe(|_, _| {});
        assert!(doubled.is_subscribed());
        assert_eq!(source.live_observations(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        source.set(3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(doubled.value(), 6);
    }
}
