use std::sync::{Arc, Mutex};

use ankurah_bindings::{BindingExt, Observation};

/// Observe `binding`, recording every delivered value. The checker drains what was recorded
/// since the last check.
#[allow(unused)]
pub fn change_watcher<T, B>(binding: &B) -> (Observation<T>, Box<dyn Fn() -> Vec<T> + Send + Sync>)
where
    T: Clone + Send + Sync + 'static,
    B: BindingExt<T>,
{
    let changes = Arc::new(Mutex::new(Vec::new()));
    let observation = {
        let changes = changes.clone();
        binding.observe(move |value, _| changes.lock().unwrap().push(value))
    };

    let check = Box::new(move || {
        let changes: Vec<T> = changes.lock().unwrap().drain(..).collect();
        changes
    });

    (observation, check)
}

/// Run `f`, returning every violation it reported on this thread.
#[allow(unused)]
pub fn violations_during<R>(f: impl FnOnce() -> R) -> (R, Vec<ankurah_bindings::Violation>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let result = ankurah_bindings::diagnostics::with_violation_handler(move |violation: &ankurah_bindings::Violation| sink.lock().unwrap().push(violation.clone()), f);
    let seen = seen.lock().unwrap().clone();
    (result, seen)
}

/// Route `tracing` output through the test harness. Safe to call from every test.
#[allow(unused)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::TRACE).with_test_writer().try_init();
}
