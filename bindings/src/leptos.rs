//! Bridge from a binding into the `reactive_graph` signal system used by Leptos.

use reactive_graph::{
    signal::{ArcReadSignal, ArcRwSignal},
    traits::Set,
};

use crate::{Binding, Observation, callback};

/// Mirrors a binding into an `ArcRwSignal`, so Leptos effects and components can track it.
///
/// The mirror follows the binding for as long as the bridge lives.
pub struct ReactiveGraphBridge<T: Send + Sync + 'static> {
    signal: ArcRwSignal<T>,
    _observation: Observation<T>,
}

impl<T> ReactiveGraphBridge<T>
where T: Clone + Send + Sync + 'static
{
    pub fn new<B: Binding<T> + ?Sized>(binding: &B) -> Self {
        let signal = ArcRwSignal::new(binding.value());
        let target = signal.clone();
        let observation = binding.observe_with(callback(move |value, _: &Observation<T>| target.set(value)));
        Self { signal, _observation: observation }
    }

    pub fn signal(&self) -> ArcReadSignal<T> { self.signal.read_only() }
}
