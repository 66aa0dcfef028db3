/// Implements identity equality and hashing for a binding handle with an inherent `id()`.
macro_rules! impl_identity {
    ($name:ident < $($param:ident),+ >) => {
        impl<$($param: 'static),+> PartialEq for $name<$($param),+> {
            fn eq(&self, other: &Self) -> bool { self.id() == other.id() }
        }

        impl<$($param: 'static),+> Eq for $name<$($param),+> {}

        impl<$($param: 'static),+> std::hash::Hash for $name<$($param),+> {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) { self.id().hash(state) }
        }
    };
}

pub mod combined;
pub mod constant;
pub mod immediate;
pub mod source;
pub mod transformed;

pub use combined::*;
pub use constant::*;
pub use immediate::*;
pub use source::*;
pub use transformed::*;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::Observation;
#[cfg(feature = "tokio")]
use crate::porcelain::Publisher;

/// Identity of a binding. Two handles compare equal iff they refer to the same binding.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BindingId(usize);

impl BindingId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<BindingId> for usize {
    fn from(id: BindingId) -> Self { id.0 }
}

impl std::fmt::Display for BindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "B-{}", self.0) }
}

/// Observation callback. Receives the new value and the observation being delivered to,
/// so the callback can pause or cancel itself mid-delivery.
pub type Callback<T> = Arc<dyn Fn(T, &Observation<T>) + Send + Sync + 'static>;

/// Wrap a closure as a [`Callback`]. Going through a generic bound lets the compiler infer
/// the higher-ranked `&Observation<T>` argument.
pub fn callback<T, F>(f: F) -> Callback<T>
where F: Fn(T, &Observation<T>) + Send + Sync + 'static {
    Arc::new(f)
}

/// A node of the binding graph: exposes a current value and hands out observations.
///
/// This trait is dyn safe; `Arc<dyn Binding<T>>` is itself a binding. The generic
/// conveniences (`observe`, `map`, `combine`, ...) live on
/// [`BindingExt`](crate::BindingExt).
pub trait Binding<T>: Send + Sync {
    fn binding_id(&self) -> BindingId;

    /// The current value. Never subscribes anything.
    fn value(&self) -> T;

    /// Register `callback` for future changes. The returned observation is the only strong
    /// owner of the registration; dropping every handle to it ends the registration.
    fn observe_with(&self, callback: Callback<T>) -> Observation<T>;

    /// Bridge this binding into an async stream: the current value first, then every change.
    #[cfg(feature = "tokio")]
    fn publisher(&self) -> Publisher<T>;
}

impl<T: 'static> Binding<T> for Arc<dyn Binding<T>> {
    fn binding_id(&self) -> BindingId { (**self).binding_id() }

    fn value(&self) -> T { (**self).value() }

    fn observe_with(&self, callback: Callback<T>) -> Observation<T> { (**self).observe_with(callback) }

    #[cfg(feature = "tokio")]
    fn publisher(&self) -> Publisher<T> { (**self).publisher() }
}
