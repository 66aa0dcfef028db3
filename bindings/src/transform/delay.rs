use std::sync::Arc;
use std::time::Duration;

use super::{Emitter, Transformer};
use crate::queue::Queue;

/// Re-emits every change after a fixed delay.
pub struct Delay {
    interval: Duration,
    queue: Arc<dyn Queue>,
}

impl Delay {
    pub fn new(interval: Duration, queue: Arc<dyn Queue>) -> Self { Self { interval, queue } }
}

impl<T> Transformer<T, T> for Delay
where T: Clone + Send + Sync + 'static
{
    fn initial_value(&self, upstream: T) -> T { upstream }

    fn on_upstream_change(&self, value: T, emitter: &Emitter<T>) {
        let emitter = emitter.clone();
        let work = Box::new(move || emitter.emit(value));
        if self.interval.is_zero() {
            // a plain hop onto the queue
            self.queue.schedule(work);
        } else {
            // delays are not cancelable; the weak emitter drops the value if the binding is gone
            let _timer = self.queue.schedule_after(self.interval, work);
        }
    }
}
