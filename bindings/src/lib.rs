/*!
Reactive bindings for ankurah: value sources, derived bindings and cancellable observations.

# Model

- A [`Source`] holds a value. Setting it synchronously notifies every [`Observation`]
  registered with it, in registration order.
- Operators on [`BindingExt`] derive new bindings: `map`, `remove_duplicates`, `combine`,
  and queue-based ones such as `delay`, `trailing_debounce` and `throttle`.
- Observations own their upstream binding; bindings only know their observations weakly.
  Dropping the last handle to an observation (or canceling it) ends it, and with it any
  chain of derived bindings nothing else holds.
- An [`ObservationStorage`] owns observations on behalf of a longer-lived owner.

Broken invariants (binding loops, double removals) are not returned as errors. They are
reported through [`diagnostics`] and the graph carries on.

# Basic usage

```rust
use ankurah_bindings::*;
use std::sync::{Arc, Mutex};

let celsius = Source::new(20.0_f64);
let fahrenheit = celsius.map(|c| c * 9.0 / 5.0 + 32.0);
assert_eq!(fahrenheit.value(), 68.0);

let readings = Arc::new(Mutex::new(Vec::new()));
let observation = {
    let readings = readings.clone();
    fahrenheit.observe(move |f, _| readings.lock().unwrap().push(f))
};

celsius.set(100.0);
assert_eq!(*readings.lock().unwrap(), vec![212.0]);

observation.cancel();
celsius.set(0.0);
assert_eq!(readings.lock().unwrap().len(), 1);
```

# Storage

```rust
use ankurah_bindings::*;

let name = Source::new("Buffy".to_string());
let storage = ObservationStorage::new();

name.observe(|name, _| println!("name: {name}")).store_in(&storage);
name.set("Willow".to_string());
// name: Willow

drop(storage); // ends the observation
assert_eq!(name.live_observations(), 0);
```

# Time

Queue-based operators take a [`Queue`](queue::Queue). [`ManualQueue`](queue::ManualQueue)
runs against virtual time:

```rust
use ankurah_bindings::{*, queue::ManualQueue};
use std::sync::{Arc, Mutex};
use std::time::Duration;

let queue = ManualQueue::new();
let query = Source::new(String::new());
let settled = query.trailing_debounce(Duration::from_millis(300), queue.clone());

let searches = Arc::new(Mutex::new(Vec::new()));
let _observation = {
    let searches = searches.clone();
    settled.observe(move |query, _| searches.lock().unwrap().push(query))
};

for partial in ["b", "bu", "buf"] {
    query.set(partial.to_string());
    queue.advance(Duration::from_millis(100));
}
queue.advance(Duration::from_millis(300));
assert_eq!(*searches.lock().unwrap(), vec!["buf".to_string()]);
```
*/

mod binding;
mod broadcast;
pub mod context;
pub mod diagnostics;
mod observation;
mod porcelain;
pub mod queue;
mod storage;
pub mod transform;

#[cfg(feature = "reactive-graph")]
mod leptos;

pub use binding::*;
pub use diagnostics::Violation;
pub use observation::*;
pub use porcelain::*;
pub use storage::*;

#[cfg(feature = "reactive-graph")]
pub use leptos::*;
