use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use super::{Clock, Queue, QueueId, Timer, Work};
use crate::context::CurrentQueue;

/// A queue that only runs when told to, against a virtual clock.
///
/// Time stands still until [`advance`](Self::advance) moves it forward; jobs run on the
/// thread calling `advance` or [`run_until_idle`](Self::run_until_idle). Cloning clones the
/// handle.
#[derive(Clone)]
pub struct ManualQueue(Arc<Inner>);

struct Inner {
    id: QueueId,
    origin: Instant,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    elapsed: Duration,
    next_sequence: u64,
    // (due, sequence): equal deadlines run in scheduling order
    jobs: BTreeMap<(Duration, u64), Work>,
}

impl Default for ManualQueue {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for ManualQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualQueue").field("id", &self.0.id).field("elapsed", &self.elapsed()).field("pending", &self.pending()).finish()
    }
}

impl ManualQueue {
    pub fn new() -> Self { Self(Arc::new(Inner { id: QueueId::next(), origin: Instant::now(), state: Mutex::new(State::default()) })) }

    /// Virtual time since the queue was created
    pub fn elapsed(&self) -> Duration { self.0.state.lock().expect("queue state lock is poisoned").elapsed }

    /// Number of jobs waiting, due or not
    pub fn pending(&self) -> usize { self.0.state.lock().expect("queue state lock is poisoned").jobs.len() }

    /// Move virtual time forward by `by`, running every job that comes due on the way.
    /// Jobs scheduled while advancing run too if they come due in time. Returns the number
    /// of jobs run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.elapsed() + by;
        let mut ran = 0;
        while let Some(job) = self.pop_due(target) {
            let _scope = CurrentQueue::enter(self.0.id);
            job();
            ran += 1;
        }
        self.0.state.lock().expect("queue state lock is poisoned").elapsed = target;
        ran
    }

    /// Run every job that is already due, without moving time.
    pub fn run_until_idle(&self) -> usize { self.advance(Duration::ZERO) }

    fn pop_due(&self, target: Duration) -> Option<Work> {
        let mut state = self.0.state.lock().expect("queue state lock is poisoned");
        let (&(due, sequence), _) = state.jobs.first_key_value()?;
        if due > target {
            return None;
        }
        state.elapsed = state.elapsed.max(due);
        state.jobs.remove(&(due, sequence))
    }

    fn push(&self, delay: Duration, work: Work) -> (Duration, u64) {
        let mut state = self.0.state.lock().expect("queue state lock is poisoned");
        let key = (state.elapsed + delay, state.next_sequence);
        state.next_sequence += 1;
        state.jobs.insert(key, work);
        key
    }
}

impl Clock for ManualQueue {
    fn now(&self) -> Instant { self.0.origin + self.elapsed() }
}

impl Queue for ManualQueue {
    fn id(&self) -> QueueId { self.0.id }

    fn schedule(&self, work: Work) { self.push(Duration::ZERO, work); }

    fn schedule_after(&self, delay: Duration, work: Work) -> Timer {
        let key = self.push(delay, work);
        let queue: Weak<Inner> = Arc::downgrade(&self.0);
        Timer::new(move || {
            if let Some(queue) = queue.upgrade() {
                // the job is dropped after the lock is released
                let _job = queue.state.lock().expect("queue state lock is poisoned").jobs.remove(&key);
            }
        })
    }
}
