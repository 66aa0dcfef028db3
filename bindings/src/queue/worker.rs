use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::time::Instant;

use super::{Clock, Queue, QueueError, QueueId, Timer, Work};
use crate::context::CurrentQueue;

/// A serial queue backed by one worker task on a tokio runtime.
///
/// The worker runs every job itself, one at a time: jobs sent with `schedule` in the order
/// they were sent, timed jobs in `(deadline, scheduling order)` order. Deadlines are tokio
/// instants, so paused tokio time (`tokio::time::pause`) drives them too.
#[derive(Clone)]
pub struct TokioQueue(Arc<Inner>);

struct Inner {
    id: QueueId,
    sender: mpsc::UnboundedSender<Work>,
    timers: Arc<Timers>,
}

/// Timed jobs waiting for their deadline. Only the worker takes jobs out of `due`, apart
/// from cancellation.
struct Timers {
    state: Mutex<TimerState>,
    // wakes the worker when an earlier deadline may have been added
    changed: Notify,
}

#[derive(Default)]
struct TimerState {
    next_sequence: u64,
    due: BTreeMap<(Instant, u64), Work>,
}

impl std::fmt::Debug for TokioQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("TokioQueue").field("id", &self.0.id).finish() }
}

impl TokioQueue {
    /// Start a queue worker on `handle`.
    pub fn new(handle: Handle) -> Self {
        let id = QueueId::next();
        let (sender, receiver) = mpsc::unbounded_channel::<Work>();
        let timers = Arc::new(Timers { state: Mutex::new(TimerState::default()), changed: Notify::new() });
        handle.spawn(run_worker(id, receiver, timers.clone()));
        Self(Arc::new(Inner { id, sender, timers }))
    }

    /// Start a queue worker on the runtime of the calling thread.
    pub fn current() -> Result<Self, QueueError> {
        let handle = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        Ok(Self::new(handle))
    }

    /// Wait until every job sent with `schedule` before this call has run.
    pub async fn flush(&self) {
        let (done, finished) = oneshot::channel();
        self.schedule(Box::new(move || {
            let _ = done.send(());
        }));
        let _ = finished.await;
    }

    /// Number of timed jobs still waiting for their deadline
    pub fn pending_timers(&self) -> usize { self.0.timers.state.lock().expect("timer lock is poisoned").due.len() }
}

impl Timers {
    fn next_deadline(&self) -> Option<Instant> {
        self.state.lock().expect("timer lock is poisoned").due.first_key_value().map(|(&(deadline, _), _)| deadline)
    }

    fn pop_due(&self, now: Instant) -> Option<Work> {
        let mut state = self.state.lock().expect("timer lock is poisoned");
        let (&key, _) = state.due.first_key_value()?;
        if key.0 > now {
            return None;
        }
        state.due.remove(&key)
    }
}

async fn run_worker(id: QueueId, mut receiver: mpsc::UnboundedReceiver<Work>, timers: Arc<Timers>) {
    loop {
        let next_deadline = timers.next_deadline();
        tokio::select! {
            biased;
            _ = tokio::time::sleep_until(next_deadline.unwrap_or_else(Instant::now)), if next_deadline.is_some() => {
                while let Some(work) = timers.pop_due(Instant::now()) {
                    run_job(id, work);
                }
            }
            work = receiver.recv() => match work {
                Some(work) => run_job(id, work),
                None => break,
            },
            _ = timers.changed.notified() => {}
        }
    }
    tracing::debug!(queue = %id, "queue worker stopped");
}

fn run_job(id: QueueId, work: Work) {
    let _scope = CurrentQueue::enter(id);
    work();
}

impl Clock for TokioQueue {
    fn now(&self) -> std::time::Instant { Instant::now().into_std() }
}

impl Queue for TokioQueue {
    fn id(&self) -> QueueId { self.0.id }

    fn schedule(&self, work: Work) {
        if self.0.sender.send(work).is_err() {
            tracing::warn!(queue = %self.0.id, "queue worker is gone; dropping job");
        }
    }

    fn schedule_after(&self, delay: Duration, work: Work) -> Timer {
        let key = {
            let mut state = self.0.timers.state.lock().expect("timer lock is poisoned");
            let key = (Instant::now() + delay, state.next_sequence);
            state.next_sequence += 1;
            state.due.insert(key, work);
            key
        };
        self.0.timers.changed.notify_one();

        let timers: Weak<Timers> = Arc::downgrade(&self.0.timers);
        Timer::new(move || {
            if let Some(timers) = timers.upgrade() {
                // the job is dropped after the lock is released
                let _job = timers.state.lock().expect("timer lock is poisoned").due.remove(&key);
            }
        })
    }
}
