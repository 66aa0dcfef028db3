use std::sync::Mutex;

use super::{Emitter, Transformer};

/// Suppresses a change that is a duplicate of the last emitted value.
///
/// The first change is always emitted, even if it equals the initial value: only emitted
/// values are compared against.
pub struct RemoveDuplicates<T, P> {
    is_duplicate: P,
    last_emitted: Mutex<Option<T>>,
}

impl<T, P> RemoveDuplicates<T, P>
where P: Fn(&T, &T) -> bool
{
    pub fn new(is_duplicate: P) -> Self { Self { is_duplicate, last_emitted: Mutex::new(None) } }
}

impl<T> RemoveDuplicates<T, fn(&T, &T) -> bool>
where T: PartialEq
{
    /// Compare with `==`
    pub fn equal() -> Self { Self::new(<T as PartialEq>::eq) }
}

impl<T, P> Transformer<T, T> for RemoveDuplicates<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: Fn(&T, &T) -> bool + Send + Sync + 'static,
{
    fn initial_value(&self, upstream: T) -> T { upstream }

    fn on_upstream_change(&self, value: T, emitter: &Emitter<T>) {
        {
            let mut last = self.last_emitted.lock().expect("dedupe lock is poisoned");
            if last.as_ref().is_some_and(|last| (self.is_duplicate)(last, &value)) {
                return;
            }
            *last = Some(value.clone());
        }
        emitter.emit(value);
    }
}
