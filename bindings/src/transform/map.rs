use super::{Emitter, Transformer};

/// Applies a function to every upstream value.
pub struct Map<F>(F);

impl<F> Map<F> {
    pub fn new(f: F) -> Self { Self(f) }
}

impl<S, T, F> Transformer<S, T> for Map<F>
where
    F: Fn(S) -> T + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn initial_value(&self, upstream: S) -> T { (self.0)(upstream) }

    fn on_upstream_change(&self, value: S, emitter: &Emitter<T>) { emitter.emit((self.0)(value)) }
}
