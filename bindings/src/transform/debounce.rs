use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{Emitter, Transformer};
use crate::queue::{Clock, Queue, Timer};

/// Lets the first change of a burst through and suppresses the rest until `interval` has
/// passed since the last accepted change.
pub struct LeadingDebounce {
    interval: Duration,
    clock: Arc<dyn Clock>,
    last_accepted: Mutex<Option<Instant>>,
}

impl LeadingDebounce {
    pub fn new(interval: Duration, clock: Arc<dyn Clock>) -> Self { Self { interval, clock, last_accepted: Mutex::new(None) } }
}

impl<T> Transformer<T, T> for LeadingDebounce
where T: Clone + Send + Sync + 'static
{
    fn initial_value(&self, upstream: T) -> T { upstream }

    fn on_upstream_change(&self, value: T, emitter: &Emitter<T>) {
        let now = self.clock.now();
        {
            let mut last_accepted = self.last_accepted.lock().expect("debounce lock is poisoned");
            if let Some(last) = *last_accepted {
                if now.saturating_duration_since(last) < self.interval {
                    return;
                }
            }
            *last_accepted = Some(now);
        }
        emitter.emit(value);
    }
}

/// Emits only the last change of a burst, `interval` after it arrived.
pub struct TrailingDebounce {
    interval: Duration,
    queue: Arc<dyn Queue>,
    pending: Mutex<Option<Timer>>,
}

impl TrailingDebounce {
    pub fn new(interval: Duration, queue: Arc<dyn Queue>) -> Self { Self { interval, queue, pending: Mutex::new(None) } }
}

impl<T> Transformer<T, T> for TrailingDebounce
where T: Clone + Send + Sync + 'static
{
    fn initial_value(&self, upstream: T) -> T { upstream }

    fn on_upstream_change(&self, value: T, emitter: &Emitter<T>) {
        let emitter = emitter.clone();
        let timer = self.queue.schedule_after(self.interval, Box::new(move || emitter.emit(value)));
        let superseded = self.pending.lock().expect("debounce lock is poisoned").replace(timer);
        if let Some(superseded) = superseded {
            superseded.cancel();
        }
    }
}
