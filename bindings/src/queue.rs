//! The scheduling collaborator used by time- and queue-based operators.
//!
//! Two implementations are provided: [`ManualQueue`], driven by hand against a virtual clock
//! (what the tests use), and `TokioQueue`, a serial worker on a tokio runtime.

mod manual;
#[cfg(feature = "tokio")]
mod worker;

pub use manual::*;
#[cfg(feature = "tokio")]
pub use worker::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::context::CurrentQueue;

/// A unit of work handed to a queue
pub type Work = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueueId(usize);

impl QueueId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for QueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Q-{}", self.0) }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("no tokio runtime is running on this thread")]
    NoRuntime,
}

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant { Instant::now() }
}

/// A serial executor with timers.
///
/// Jobs scheduled on the same queue run one at a time, in the order they became due.
pub trait Queue: Clock {
    fn id(&self) -> QueueId;

    /// Run `work` as soon as possible, never synchronously inside this call.
    fn schedule(&self, work: Work);

    /// Run `work` once `delay` has elapsed. The returned timer can cancel it; dropping the
    /// timer does not.
    fn schedule_after(&self, delay: Duration, work: Work) -> Timer;

    /// Whether the calling code is currently running as a job of this queue
    fn is_current(&self) -> bool { CurrentQueue::is(self.id()) }
}

/// Handle to a scheduled job.
pub struct Timer {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Timer {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self { Self { cancel: Some(Box::new(cancel)) } }

    /// A timer with nothing to cancel
    pub fn inert() -> Self { Self { cancel: None } }

    /// Prevent the job from running, if it has not run yet.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer").field("cancelable", &self.cancel.is_some()).finish()
    }
}
