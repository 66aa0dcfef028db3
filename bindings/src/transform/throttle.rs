use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Emitter, Transformer};
use crate::queue::Queue;

/// Emits at most one value per `interval`.
///
/// A change arriving while no window is open opens one. With `invoke_immediately` that
/// change is emitted right away (synchronously if it already arrives on the queue);
/// otherwise it is held until the window closes. Changes arriving inside an open window
/// are held too: with `latest` the newest one wins, without it the first one is kept. When
/// a window closes with a held value, that value is emitted and a new window opens.
pub struct Throttle<T> {
    interval: Duration,
    latest: bool,
    invoke_immediately: bool,
    queue: Arc<dyn Queue>,
    state: Arc<Mutex<Window<T>>>,
}

struct Window<T> {
    open: bool,
    held: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration, latest: bool, invoke_immediately: bool, queue: Arc<dyn Queue>) -> Self {
        Self { interval, latest, invoke_immediately, queue, state: Arc::new(Mutex::new(Window { open: false, held: None })) }
    }
}

impl<T> Transformer<T, T> for Throttle<T>
where T: Clone + Send + Sync + 'static
{
    fn initial_value(&self, upstream: T) -> T { upstream }

    fn on_upstream_change(&self, value: T, emitter: &Emitter<T>) {
        {
            let mut window = self.state.lock().expect("throttle lock is poisoned");
            if window.open {
                if self.latest || window.held.is_none() {
                    window.held = Some(value);
                }
                return;
            }
            window.open = true;
            if !self.invoke_immediately {
                window.held = Some(value);
                drop(window);
                open_window(self.queue.clone(), self.interval, self.state.clone(), emitter.clone());
                return;
            }
        }

        open_window(self.queue.clone(), self.interval, self.state.clone(), emitter.clone());
        if self.queue.is_current() {
            emitter.emit(value);
        } else {
            let emitter = emitter.clone();
            self.queue.schedule(Box::new(move || emitter.emit(value)));
        }
    }
}

fn open_window<T>(queue: Arc<dyn Queue>, interval: Duration, state: Arc<Mutex<Window<T>>>, emitter: Emitter<T>)
where T: Clone + Send + Sync + 'static {
    let next_queue = queue.clone();
    let _timer = queue.schedule_after(interval, Box::new(move || close_window(next_queue, interval, state, emitter)));
}

fn close_window<T>(queue: Arc<dyn Queue>, interval: Duration, state: Arc<Mutex<Window<T>>>, emitter: Emitter<T>)
where T: Clone + Send + Sync + 'static {
    let held = {
        let mut window = state.lock().expect("throttle lock is poisoned");
        match window.held.take() {
            Some(value) if emitter.is_alive() => value,
            _ => {
                window.open = false;
                return;
            }
        }
    };
    open_window(queue, interval, state, emitter.clone());
    emitter.emit(held);
}
