use std::sync::Arc;

#[cfg(feature = "tokio")]
use crate::porcelain::Publisher;
use crate::{
    Binding, BindingId, Callback, Observation, ObservationStorage, callback,
    transform::{Emitter, Slot},
};

/// The pair of two bindings' values, following changes on either side.
///
/// Unlike [`Transformed`](super::Transformed), a combined binding observes both upstreams
/// from the moment it is created. The observations live in a storage owned by the binding
/// and end when it is released.
pub struct Combined<A, B>(Arc<Inner<A, B>>);

struct Inner<A, B> {
    a: Arc<dyn Binding<A>>,
    b: Arc<dyn Binding<B>>,
    slot: Arc<Slot<(A, B)>>,
    _observations: ObservationStorage,
}

impl<A, B> Clone for Combined<A, B> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl_identity!(Combined<A, B>);

impl<A: 'static, B: 'static> std::fmt::Debug for Combined<A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Combined").field("id", &self.id()).field("a", &self.0.a.binding_id()).field("b", &self.0.b.binding_id()).finish()
    }
}

impl<A, B> Combined<A, B> {
    pub fn id(&self) -> BindingId { self.0.slot.id() }
}

impl<A, B> Combined<A, B>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    pub fn new(a: Arc<dyn Binding<A>>, b: Arc<dyn Binding<B>>) -> Self {
        let slot = Arc::new(Slot::new(Some((a.value(), b.value()))));
        let observations = ObservationStorage::new();
        let emitter = Emitter::new(&slot);

        {
            let other = b.clone();
            let emitter = emitter.clone();
            a.observe_with(callback(move |value, _: &Observation<A>| emitter.emit((value, other.value())))).store_in(&observations);
        }
        {
            let other = a.clone();
            b.observe_with(callback(move |value, _: &Observation<B>| emitter.emit((other.value(), value)))).store_in(&observations);
        }

        Self(Arc::new(Inner { a, b, slot, _observations: observations }))
    }
}

impl<A, B> Binding<(A, B)> for Combined<A, B>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    fn binding_id(&self) -> BindingId { self.id() }

    fn value(&self) -> (A, B) { self.0.slot.get().unwrap_or_else(|| (self.0.a.value(), self.0.b.value())) }

    fn observe_with(&self, callback: Callback<(A, B)>) -> Observation<(A, B)> {
        Observation::register(self.0.slot.broadcast(), Arc::new(self.clone()), callback)
    }

    #[cfg(feature = "tokio")]
    fn publisher(&self) -> Publisher<(A, B)> { Publisher::attach(self.0.slot.broadcast(), Arc::new(self.clone()), self.value()) }
}
