use std::sync::Arc;

#[cfg(feature = "tokio")]
use crate::porcelain::Publisher;
use crate::{Binding, BindingId, Callback, Observation, broadcast::Broadcast};

/// A binding whose value never changes. Its observations are valid but never fire.
pub struct Constant<T>(Arc<Inner<T>>);

struct Inner<T> {
    value: T,
    broadcast: Broadcast<T>,
}

impl<T> Clone for Constant<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl_identity!(Constant<T>);

impl<T: std::fmt::Debug> std::fmt::Debug for Constant<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constant").field("id", &self.id()).field("value", &self.0.value).finish()
    }
}

impl<T> Constant<T> {
    pub fn new(value: T) -> Self { Self(Arc::new(Inner { value, broadcast: Broadcast::new() })) }

    pub fn id(&self) -> BindingId { self.0.broadcast.id() }
}

impl<T> Binding<T> for Constant<T>
where T: Clone + Send + Sync + 'static
{
    fn binding_id(&self) -> BindingId { self.id() }

    fn value(&self) -> T { self.0.value.clone() }

    fn observe_with(&self, callback: Callback<T>) -> Observation<T> { Observation::register(&self.0.broadcast, Arc::new(self.clone()), callback) }

    #[cfg(feature = "tokio")]
    fn publisher(&self) -> Publisher<T> { Publisher::attach(&self.0.broadcast, Arc::new(self.clone()), self.value()) }
}
