mod common;

use ankurah_bindings::*;
use common::{change_watcher, violations_during};

#[test]
fn cancel_stops_delivery_and_is_idempotent() {
    let cell = Source::new(0);
    let (observation, check) = change_watcher(&cell);

    cell.set(1);
    observation.cancel();
    cell.set(2);
    let (_, violations) = violations_during(|| observation.cancel());

    assert_eq!(check(), vec![1]);
    assert!(violations.is_empty());
}

#[test]
fn checked_double_cancel_is_reported() {
    let cell = Source::new(0);
    let observation = cell.observe(|_, _| {});
    observation.cancel_checked();

    let (_, violations) = violations_during(|| observation.cancel_checked());
    assert_eq!(violations, vec![Violation::AlreadyCanceled { observation: observation.id() }]);
}

#[test]
fn dropping_every_handle_ends_the_observation() {
    let cell = Source::new(0);
    let (observation, check) = change_watcher(&cell);
    assert_eq!(cell.live_observations(), 1);

    drop(observation);
    cell.set(1);
    assert_eq!(cell.live_observations(), 0);
    assert!(check().is_empty());
}

#[test]
fn canceling_evicts_from_every_storage() {
    let cell = Source::new(0);
    let first = ObservationStorage::new();
    let second = ObservationStorage::new();

    let observation = cell.observe(|_, _| {});
    observation.store_in(&first);
    observation.store_in_for(&second, "renderer");
    assert!(first.contains(&observation) && second.contains_key("renderer"));

    observation.cancel();
    assert!(first.is_empty());
    assert!(second.is_empty());
    assert_eq!(cell.live_observations(), 0);
}

#[test]
fn storage_owned_observation_lives_as_long_as_the_storage() {
    let cell = Source::new(0);
    let storage = ObservationStorage::new();
    let check = {
        let (observation, check) = change_watcher(&cell);
        observation.store_in(&storage);
        check
    };

    cell.set(1);
    storage.remove_all();
    cell.set(2);
    assert_eq!(check(), vec![1]);
}

#[test]
fn releasing_the_last_observation_frees_the_chain() {
    common::init_tracing();
    let cell = Source::new(1);
    let weak_cell = cell.downgrade();
    let (observation, check) = {
        let doubled = cell.map(|value| value * 2);
        let labeled = doubled.map(|value| format!("={value}"));
        change_watcher(&labeled)
    };

    cell.set(4);
    assert_eq!(check(), vec!["=8".to_string()]);

    // the observation now owns the chain and, through it, the source
    drop(cell);
    let cell = weak_cell.upgrade().expect("chain keeps the source alive");
    assert_eq!(cell.live_observations(), 1);
    drop(cell);

    drop(observation);
    assert!(weak_cell.upgrade().is_none());
}

#[test]
fn released_combine_ends_both_upstream_observations() {
    let a = Source::new(1);
    let b = Source::new("x");
    let combined = a.combine(&b);
    assert_eq!(a.live_observations(), 1);
    assert_eq!(b.live_observations(), 1);

    drop(combined);
    assert_eq!(a.live_observations(), 0);
    assert_eq!(b.live_observations(), 0);
}

#[test]
fn storage_cancel_all_cancels_and_empties() {
    let cell = Source::new(0);
    let storage = ObservationStorage::new();
    let kept = cell.observe(|_, _| {});
    kept.store_in(&storage);
    cell.observe(|_, _| {}).store_in_for(&storage, "anonymous");

    storage.cancel_all();
    assert!(kept.is_canceled());
    assert!(storage.is_empty());
    assert_eq!(cell.live_observations(), 0);
}
