mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ankurah_bindings::{queue::*, *};
use common::change_watcher;

fn ms(millis: u64) -> Duration { Duration::from_millis(millis) }

#[test]
fn delay_emits_after_the_interval() {
    common::init_tracing();
    let queue = ManualQueue::new();
    let cell = Source::new(0);
    let delayed = cell.delay(ms(10), queue.clone());
    let (_observation, check) = change_watcher(&delayed);

    cell.set(1);
    queue.advance(ms(9));
    assert!(check().is_empty());

    queue.advance(ms(1));
    assert_eq!(check(), vec![1]);
    assert_eq!(delayed.value(), 1);
}

#[test]
fn zero_delay_is_an_async_hop() {
    let queue = ManualQueue::new();
    let cell = Source::new(0);
    let hopped = cell.delay(Duration::ZERO, queue.clone());
    let (_observation, check) = change_watcher(&hopped);

    cell.set(1);
    assert!(check().is_empty());
    assert_eq!(queue.run_until_idle(), 1);
    assert_eq!(check(), vec![1]);
}

#[test]
fn delayed_emission_after_release_is_dropped() {
    let queue = ManualQueue::new();
    let cell = Source::new(0);
    let (observation, check) = change_watcher(&cell.delay(ms(10), queue.clone()));

    cell.set(1);
    drop(observation);
    assert_eq!(queue.pending(), 1);
    queue.advance(ms(10));
    assert!(check().is_empty());
}

fn receive_on_order(always_async: bool) -> Vec<String> {
    let queue = ManualQueue::new();
    let cell = Source::new(0);
    let log = Arc::new(Mutex::new(Vec::new()));

    let received = cell.receive_on(queue.clone(), always_async);
    let _observation = {
        let log = log.clone();
        received.observe(move |value, _| log.lock().unwrap().push(format!("received {value}")))
    };

    {
        let log = log.clone();
        queue.schedule(Box::new(move || {
            cell.set(5);
            log.lock().unwrap().push("set returned".to_string());
        }));
    }
    queue.run_until_idle();

    let log = log.lock().unwrap().clone();
    log
}

#[test]
fn receive_on_is_synchronous_when_already_on_the_queue() {
    assert_eq!(receive_on_order(false), vec!["received 5", "set returned"]);
}

#[test]
fn receive_on_always_async_defers_even_on_the_queue() {
    assert_eq!(receive_on_order(true), vec!["set returned", "received 5"]);
}

#[test]
fn receive_on_from_elsewhere_is_scheduled() {
    let queue = ManualQueue::new();
    let cell = Source::new(0);
    let received = cell.receive_on(queue.clone(), false);
    let (_observation, check) = change_watcher(&received);

    cell.set(1);
    assert!(check().is_empty());
    queue.run_until_idle();
    assert_eq!(check(), vec![1]);
}

#[test]
fn leading_debounce_passes_the_first_of_a_burst() {
    let queue = ManualQueue::new();
    let cell = Source::new(0);
    let debounced = cell.leading_debounce_with_clock(ms(100), queue.clone());
    let (_observation, check) = change_watcher(&debounced);

    cell.set(1);
    queue.advance(ms(50));
    cell.set(2);
    queue.advance(ms(50));
    cell.set(3);
    cell.set(4);

    assert_eq!(check(), vec![1, 3]);
}

#[test]
fn trailing_debounce_emits_the_last_of_each_burst() {
    let queue = ManualQueue::new();
    let cell = Source::new(0);
    let debounced = cell.trailing_debounce(ms(100), queue.clone());
    let (_observation, check) = change_watcher(&debounced);

    cell.set(1);
    cell.set(2);
    queue.advance(ms(99));
    assert!(check().is_empty());
    queue.advance(ms(1));
    assert_eq!(check(), vec![2]);

    cell.set(3);
    queue.advance(ms(60));
    cell.set(4);
    queue.advance(ms(60));
    assert!(check().is_empty());
    queue.advance(ms(40));
    assert_eq!(check(), vec![4]);
    assert_eq!(queue.pending(), 0);
}

#[test]
fn throttle_latest_invoke_immediately() {
    let queue = ManualQueue::new();
    let cell = Source::new(0);
    let throttled = cell.throttle(ms(100), true, true, queue.clone());
    let (_observation, check) = change_watcher(&throttled);

    cell.set(1);
    cell.set(2);
    cell.set(3);
    queue.run_until_idle();
    assert_eq!(check(), vec![1]);

    queue.advance(ms(100));
    assert_eq!(check(), vec![3]);

    // nothing held at the end of the second window: it closes
    queue.advance(ms(100));
    assert!(check().is_empty());
    assert_eq!(queue.pending(), 0);

    cell.set(4);
    queue.run_until_idle();
    assert_eq!(check(), vec![4]);
}

#[test]
fn throttle_first_held_without_immediate_invoke() {
    let queue = ManualQueue::new();
    let cell = Source::new(0);
    let throttled = cell.throttle(ms(100), false, false, queue.clone());
    let (_observation, check) = change_watcher(&throttled);

    cell.set(1);
    cell.set(2);
    cell.set(3);
    queue.run_until_idle();
    assert!(check().is_empty());

    queue.advance(ms(100));
    assert_eq!(check(), vec![1]);

    cell.set(4);
    queue.advance(ms(100));
    assert_eq!(check(), vec![4]);
}

#[test]
fn throttle_dispatches_inline_on_its_own_queue() {
    let queue = ManualQueue::new();
    let cell = Source::new(0);
    let throttled = cell.throttle(ms(100), true, true, queue.clone());
    let (_observation, check) = change_watcher(&throttled);

    let check = Arc::new(check);
    let seen_inline = Arc::new(Mutex::new(Vec::new()));
    {
        let check = check.clone();
        let seen_inline = seen_inline.clone();
        queue.schedule(Box::new(move || {
            cell.set(1);
            *seen_inline.lock().unwrap() = check();
        }));
    }
    queue.run_until_idle();
    assert_eq!(*seen_inline.lock().unwrap(), vec![1]);
}
