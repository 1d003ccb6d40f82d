//! Races between engines sharing one store directory.

use larder_core::{Engine, Permissions, StoreLock, WriteOutcome};
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

fn race<T, F>(root: PathBuf, op: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(&Engine, usize) -> T + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(THREADS));
    let op = Arc::new(op);
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            let op = Arc::clone(&op);
            let root = root.clone();
            thread::spawn(move || {
                let engine = Engine::new(root);
                barrier.wait();
                op(&engine, i)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn concurrent_claims_have_exactly_one_winner() {
    let store = tempfile::tempdir().unwrap();
    let engine = Engine::new(store.path());
    let d = engine.start_donation("Pearl", None).unwrap();

    let results = race(store.path().to_path_buf(), move |engine, i| {
        engine.claim(d, &format!("receiver-{i}")).is_ok()
    });

    assert_eq!(results.iter().filter(|won| **won).count(), 1);
    let winner = results.iter().position(|won| *won).unwrap();
    assert_eq!(
        engine.get_donation(d).unwrap().receiver.as_deref(),
        Some(format!("receiver-{winner}").as_str())
    );
}

#[test]
fn concurrent_item_adds_aggregate_into_one_row() {
    let store = tempfile::tempdir().unwrap();
    let engine = Engine::new(store.path());
    engine.add_barcode("0001", "beans", "can").unwrap();
    let d = engine.start_donation("Pearl", None).unwrap();

    let ids = race(store.path().to_path_buf(), move |engine, i| {
        if i % 2 == 0 {
            engine.add_item_manual(d, "beans", 2, "can").unwrap()
        } else {
            engine.add_item_barcode(d, "0001", 0).unwrap()
        }
    });

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    let items = engine.get_items(d).unwrap();
    assert_eq!(items.len(), 1);
    // Four manual adds of 2 and four scans counted as 1.
    assert_eq!(items[0].count, 12);
}

#[test]
fn concurrent_bootstrap_yields_one_root() {
    let store = tempfile::tempdir().unwrap();

    let outcomes = race(store.path().to_path_buf(), |engine, i| {
        engine
            .write_user(None, &format!("root-{i}"), Permissions::PROVIDER, "pw")
            .ok()
    });

    let bootstrapped = outcomes
        .iter()
        .filter(|o| **o == Some(WriteOutcome::Bootstrapped))
        .count();
    assert_eq!(bootstrapped, 1);
    assert!(outcomes.iter().all(|o| *o != Some(WriteOutcome::Created)));

    let users = Engine::new(store.path()).list_users().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].permissions, Permissions::FULL);
}

#[test]
fn concurrent_donations_get_distinct_ids() {
    let store = tempfile::tempdir().unwrap();

    let mut ids = race(store.path().to_path_buf(), |engine, _| {
        engine.start_donation("Pearl", None).unwrap()
    });
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), THREADS);
}

#[test]
fn operations_wait_for_held_lock() {
    let store = tempfile::tempdir().unwrap();
    let engine = Engine::new(store.path());
    engine.initialize().unwrap();
    let held = StoreLock::acquire(engine.store_layout()).unwrap();
    let root = store.path().to_path_buf();
    let handle = thread::spawn(move || Engine::new(root).start_donation("Pearl", None));

    thread::sleep(std::time::Duration::from_millis(100));
    assert!(!handle.is_finished());
    drop(held);

    let id = handle.join().unwrap().unwrap();
    assert_eq!(id.get(), 1);
}
