use std::sync::Arc;

use super::{Emitter, Transformer};
use crate::queue::Queue;

/// Re-emits every change on a queue.
pub struct ReceiveOn {
    queue: Arc<dyn Queue>,
    always_async: bool,
}

impl ReceiveOn {
    /// With `always_async` false, a change that already arrives on `queue` is emitted
    /// synchronously instead of being scheduled.
    pub fn new(queue: Arc<dyn Queue>, always_async: bool) -> Self { Self { queue, always_async } }
}

impl<T> Transformer<T, T> for ReceiveOn
where T: Clone + Send + Sync + 'static
{
    fn initial_value(&self, upstream: T) -> T { upstream }

    fn on_upstream_change(&self, value: T, emitter: &Emitter<T>) {
        if !self.always_async && self.queue.is_current() {
            emitter.emit(value);
            return;
        }
        let emitter = emitter.clone();
        self.queue.schedule(Box::new(move || emitter.emit(value)));
    }
}
