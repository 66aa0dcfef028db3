//! Invariant violation reporting.
//!
//! Nothing in this crate returns an error for a broken binding graph. A binding loop, a
//! removal of an entry that is not there, or an explicitly checked double cancel are
//! programmer errors: they are reported through the handler installed here, and the
//! operation that tripped them continues in a safe degraded state (usually by skipping the
//! offending delivery).
//!
//! Handlers are looked up in this order:
//! 1. the innermost handler installed on the current thread with [`with_violation_handler`]
//! 2. the process-wide handler installed with [`set_violation_handler`]
//! 3. the default handler, which logs through `tracing` and continues
//!
//! With the `panic-on-violation` feature the default handler panics in debug builds.
//! Release builds never panic.

use std::cell::RefCell;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::{BindingId, ObservationId, StorageKey};

/// A broken invariant of the binding graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// A binding's fan-out was re-entered on the same thread.
    #[error("binding loop detected on binding {binding}")]
    BindingLoop { binding: BindingId },

    /// An observation tried to unregister from a binding that no longer lists it.
    #[error("observation {observation} is not registered with binding {binding}")]
    MissingRegistration { binding: BindingId, observation: ObservationId },

    /// A storage was asked to remove an entry it does not hold.
    #[error("observation storage has no entry for {key}")]
    MissingStorageEntry { key: StorageKey },

    /// `cancel_checked` was called on an observation that was already canceled.
    #[error("observation {observation} was already canceled")]
    AlreadyCanceled { observation: ObservationId },
}

pub type ViolationHandler = Arc<dyn Fn(&Violation) + Send + Sync + 'static>;

static GLOBAL_HANDLER: RwLock<Option<ViolationHandler>> = RwLock::new(None);

thread_local! {
    static SCOPED_HANDLERS: RefCell<Vec<ViolationHandler>> = const { RefCell::new(Vec::new()) };
}

/// Install the process-wide violation handler, replacing any previous one.
pub fn set_violation_handler<F>(handler: F)
where F: Fn(&Violation) + Send + Sync + 'static {
    *GLOBAL_HANDLER.write().expect("violation handler lock is poisoned") = Some(Arc::new(handler));
}

/// Restore the default (logging) handler.
pub fn reset_violation_handler() { *GLOBAL_HANDLER.write().expect("violation handler lock is poisoned") = None; }

/// Run `f` with `handler` receiving every violation reported on this thread.
///
/// Scopes nest; the innermost handler wins. Violations reported on other threads (for
/// example from a queue worker) do not see this handler.
pub fn with_violation_handler<F, R>(handler: F, f: impl FnOnce() -> R) -> R
where F: Fn(&Violation) + Send + Sync + 'static {
    struct ScopeGuard;
    impl Drop for ScopeGuard {
        fn drop(&mut self) {
            SCOPED_HANDLERS.with(|handlers| {
                handlers.borrow_mut().pop();
            });
        }
    }

    SCOPED_HANDLERS.with(|handlers| handlers.borrow_mut().push(Arc::new(handler)));
    let _guard = ScopeGuard;
    f()
}

/// Report a violation to the active handler.
pub fn report(violation: Violation) {
    // Handlers are cloned out so that no lock or borrow is held while they run
    let handler = SCOPED_HANDLERS
        .with(|handlers| handlers.borrow().last().cloned())
        .or_else(|| GLOBAL_HANDLER.read().expect("violation handler lock is poisoned").clone());

    match handler {
        Some(handler) => handler(&violation),
        None => default_handler(&violation),
    }
}

fn default_handler(violation: &Violation) {
    tracing::error!(%violation, "binding invariant violated");

    #[cfg(all(debug_assertions, feature = "panic-on-violation"))]
    panic!("binding invariant violated: {violation}");
}
