use std::sync::Arc;

#[cfg(feature = "tokio")]
use crate::porcelain::Publisher;
use crate::{Binding, BindingId, Callback, Observation};

/// Wraps a binding so that observing it also delivers the current value right away.
///
/// This is a decorator, not a node of its own: it shares the identity of the binding it
/// wraps, and its observations are registered directly with that binding.
pub struct Immediate<T> {
    upstream: Arc<dyn Binding<T>>,
}

impl<T> Clone for Immediate<T> {
    fn clone(&self) -> Self { Self { upstream: self.upstream.clone() } }
}

impl_identity!(Immediate<T>);

impl<T: 'static> std::fmt::Debug for Immediate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("Immediate").field("id", &self.id()).finish() }
}

impl<T: 'static> Immediate<T> {
    pub fn id(&self) -> BindingId { self.upstream.binding_id() }
}

impl<T> Immediate<T>
where T: Clone + Send + Sync + 'static
{
    pub fn new(upstream: Arc<dyn Binding<T>>) -> Self { Self { upstream } }
}

impl<T> Binding<T> for Immediate<T>
where T: Clone + Send + Sync + 'static
{
    fn binding_id(&self) -> BindingId { self.id() }

    fn value(&self) -> T { self.upstream.value() }

    fn observe_with(&self, callback: Callback<T>) -> Observation<T> {
        let observation = self.upstream.observe_with(callback);
        observation.0.deliver(self.upstream.value());
        observation
    }

    // publishers always start with the current value
    #[cfg(feature = "tokio")]
    fn publisher(&self) -> Publisher<T> { self.upstream.publisher() }
}
