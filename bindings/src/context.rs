use crate::{BindingId, queue::QueueId};
use std::cell::RefCell;
use std::marker::PhantomData;

// Per-thread bookkeeping. Fan-out is synchronous, so "what is in flight on this thread" is
// exactly the set of bindings whose notify call is somewhere on the current stack.
thread_local! {
    static LOOP_DETECTOR: RefCell<LoopDetector> = RefCell::new(LoopDetector::new());
    static QUEUE_STACK: RefCell<Vec<QueueId>> = const { RefCell::new(Vec::new()) };
}

/// Tracks which bindings are currently fanning out.
///
/// A binding may only be entered once at a time. Entering it again before leaving is a
/// binding loop. One detector is installed per thread (see [`FanoutGuard`]), so writes to
/// the same binding from two different threads are never flagged.
#[derive(Debug, Default)]
pub struct LoopDetector {
    in_flight: Vec<BindingId>,
}

impl LoopDetector {
    pub fn new() -> Self { Self { in_flight: Vec::new() } }

    /// Mark `binding` as in flight. Returns false if it already was.
    pub fn enter(&mut self, binding: BindingId) -> bool {
        if self.in_flight.contains(&binding) {
            return false;
        }
        self.in_flight.push(binding);
        true
    }

    /// Clear the in-flight mark for `binding`. Returns false if it was not marked.
    pub fn leave(&mut self, binding: BindingId) -> bool {
        match self.in_flight.iter().rposition(|id| *id == binding) {
            Some(position) => {
                self.in_flight.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn is_in_flight(&self, binding: BindingId) -> bool { self.in_flight.contains(&binding) }

    /// Number of nested fan-outs currently in flight
    pub fn depth(&self) -> usize { self.in_flight.len() }
}

/// Marks a binding as fanning out on the current thread until dropped.
pub struct FanoutGuard {
    binding: BindingId,
    // must be dropped on the thread that created it
    _not_send: PhantomData<*const ()>,
}

impl FanoutGuard {
    /// Enter `binding` on this thread's loop detector. `None` means the binding is already
    /// fanning out further up the stack.
    pub fn enter(binding: BindingId) -> Option<Self> {
        let entered = LOOP_DETECTOR.with(|detector| detector.borrow_mut().enter(binding));
        entered.then_some(Self { binding, _not_send: PhantomData })
    }

    /// Whether `binding` is fanning out on the current thread
    pub fn is_in_flight(binding: BindingId) -> bool { LOOP_DETECTOR.with(|detector| detector.borrow().is_in_flight(binding)) }

    /// Number of fan-outs in flight on the current thread
    pub fn depth() -> usize { LOOP_DETECTOR.with(|detector| detector.borrow().depth()) }
}

impl Drop for FanoutGuard {
    fn drop(&mut self) {
        LOOP_DETECTOR.with(|detector| {
            detector.borrow_mut().leave(self.binding);
        });
    }
}

/// Records which queue is running a job on the current thread, so that
/// [`Queue::is_current`](crate::queue::Queue::is_current) can answer without help from the
/// underlying executor.
pub struct CurrentQueue {}

impl CurrentQueue {
    /// Mark `queue` as current until the returned scope is dropped. Scopes nest.
    pub fn enter(queue: QueueId) -> QueueScope {
        QUEUE_STACK.with(|stack| stack.borrow_mut().push(queue));
        QueueScope { queue }
    }

    /// Whether `queue` is the innermost queue running on this thread
    pub fn is(queue: QueueId) -> bool { Self::current() == Some(queue) }

    pub fn current() -> Option<QueueId> { QUEUE_STACK.with(|stack| stack.borrow().last().copied()) }
}

pub struct QueueScope {
    queue: QueueId,
}

impl Drop for QueueScope {
    fn drop(&mut self) {
        QUEUE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack.iter().rposition(|id| *id == self.queue) {
                stack.remove(position);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_rejects_reentry_until_left() {
        let a = BindingId::next();
        let b = BindingId::next();
        let mut detector = LoopDetector::new();

        assert!(detector.enter(a));
        assert!(detector.enter(b));
        assert!(!detector.enter(a));
        assert_eq!(detector.depth(), 2);

        assert!(detector.leave(b));
        assert!(!detector.leave(b));
        assert!(detector.leave(a));
        assert!(detector.enter(a));
    }

    #[test]
    fn guard_leaves_on_drop() {
        let binding = BindingId::next();
        {
            let _guard = FanoutGuard::enter(binding).expect("first entry");
            assert!(FanoutGuard::is_in_flight(binding));
            assert!(FanoutGuard::enter(binding).is_none());
        }
        assert!(!FanoutGuard::is_in_flight(binding));
        assert!(FanoutGuard::enter(binding).is_some());
    }

    #[test]
    fn detector_is_per_thread() {
        let binding = BindingId::next();
        let _guard = FanoutGuard::enter(binding).expect("first entry");

        let entered_elsewhere = std::thread::spawn(move || FanoutGuard::enter(binding).is_some()).join().unwrap();
        assert!(entered_elsewhere);
    }

    #[test]
    fn queue_scopes_nest() {
        let outer = QueueId::next();
        let inner = QueueId::next();
        assert_eq!(CurrentQueue::current(), None);

        let outer_scope = CurrentQueue::enter(outer);
        {
            let _inner_scope = CurrentQueue::enter(inner);
            assert!(CurrentQueue::is(inner));
            assert!(!CurrentQueue::is(outer));
        }
        assert!(CurrentQueue::is(outer));
        drop(outer_scope);
        assert_eq!(CurrentQueue::current(), None);
    }
}
