#![allow(clippy::unwrap_used)]

mod common;

use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::Duration;

use common::{Asset, CODE, PRIMARY, collection, snapshot};
use memdex::{Tx, Value};

const WATCHDOG: Duration = Duration::from_secs(10);

/// Two committed rows, two updates each wanting the other's unique code
/// slot. Both calls must come back in bounded time (the failure mode this
/// pins down is each writer asleep on the other's row lock), and neither
/// can win, so the rows stay as they were.
#[test]
fn crossed_updates_terminate_and_stay_consistent() {
    for _ in 0..200 {
        let collection = Arc::new(collection());
        let first = Asset::new(1, "swap", 1, 1);
        let second = Asset::new(2, "swap", 2, 2);
        assert_eq!(collection.put(&Tx::new(), first.clone(), 0), Some(1));
        assert_eq!(collection.put(&Tx::new(), second.clone(), 0), Some(1));

        let barrier = Arc::new(Barrier::new(2));
        let (done, results) = mpsc::channel();
        for update in [Asset::new(1, "swap", 1, 2), Asset::new(2, "swap", 2, 1)] {
            let collection = Arc::clone(&collection);
            let barrier = Arc::clone(&barrier);
            let done = done.clone();
            thread::spawn(move || {
                barrier.wait();
                let result = collection.put(&Tx::new(), update, 0);
                let _ = done.send(result);
            });
        }
        drop(done);

        assert_eq!(results.recv_timeout(WATCHDOG).expect("put deadlocked"), None);
        assert_eq!(results.recv_timeout(WATCHDOG).expect("put deadlocked"), None);

        let tx = Tx::new();
        assert_eq!(
            collection.get(&tx, PRIMARY, &[vec![Value::from(1u64)]]),
            vec![first.clone()]
        );
        assert_eq!(
            collection.get(&tx, PRIMARY, &[vec![Value::from(2u64)]]),
            vec![second.clone()]
        );
        let mut codes = Vec::new();
        collection.range(CODE, |_, record| {
            codes.push((record.code, record.id));
            true
        });
        codes.sort_unstable();
        assert_eq!(codes, vec![(1, 1), (2, 2)]);
    }
}

/// Two inserts racing for one unique code slot: exactly one may land, and
/// the loser's rollback must leave no entry in any index.
#[test]
fn racing_inserts_on_one_unique_slot_admit_exactly_one() {
    for _ in 0..200 {
        let collection = Arc::new(collection());
        let barrier = Arc::new(Barrier::new(2));
        let (done, results) = mpsc::channel();
        for id in [1u64, 2] {
            let collection = Arc::clone(&collection);
            let barrier = Arc::clone(&barrier);
            let done = done.clone();
            thread::spawn(move || {
                barrier.wait();
                let result = collection.put(&Tx::new(), Asset::new(id, "race", id as i64, 7), 0);
                let _ = done.send(result);
            });
        }
        drop(done);

        let outcomes = [
            results.recv_timeout(WATCHDOG).expect("put deadlocked"),
            results.recv_timeout(WATCHDOG).expect("put deadlocked"),
        ];
        let winners = outcomes.iter().filter(|cas| cas.is_some()).count();
        assert_eq!(winners, 1, "outcomes: {outcomes:?}");

        // one record, filed once per index
        assert_eq!(snapshot(&collection).len(), 4);
    }
}

/// Two writers on the same primary key: the loser of the reservation race
/// waits the winner out and lands as an update. Both must succeed.
#[test]
fn concurrent_puts_on_one_key_serialize() {
    for _ in 0..100 {
        let collection = Arc::new(collection());
        let barrier = Arc::new(Barrier::new(2));
        let (done, results) = mpsc::channel();
        for (name, code) in [(1i64, 1i64), (2, 2)] {
            let collection = Arc::clone(&collection);
            let barrier = Arc::clone(&barrier);
            let done = done.clone();
            thread::spawn(move || {
                barrier.wait();
                let result = collection.put(&Tx::new(), Asset::new(7, "one", name, code), 0);
                let _ = done.send(result);
            });
        }
        drop(done);

        let mut versions = [
            results.recv_timeout(WATCHDOG).expect("put deadlocked"),
            results.recv_timeout(WATCHDOG).expect("put deadlocked"),
        ];
        versions.sort_unstable();
        assert_eq!(versions, [Some(1), Some(2)]);

        let found = collection.get(&Tx::new(), PRIMARY, &[vec![Value::from(7u64)]]);
        assert_eq!(found.len(), 1);
        assert_eq!(snapshot(&collection).len(), 4);
    }
}

/// Writers on disjoint primary keys never interact: every put succeeds and
/// the final state is the union of the per-key outcomes.
#[test]
fn disjoint_keys_do_not_interfere() {
    let collection = Arc::new(collection());
    let mut handles = Vec::new();
    for id in 0..8u64 {
        let collection = Arc::clone(&collection);
        handles.push(thread::spawn(move || {
            let tx = Tx::new();
            let mut version = 0;
            for _ in 0..50 {
                let asset = Asset::new(id, "bulk", id as i64, id as i64);
                version = collection.put(&tx, asset, 0).expect("disjoint put failed");
            }
            version
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 50);
    }

    let tx = Tx::new();
    for id in 0..8u64 {
        let found = collection.get(&tx, PRIMARY, &[vec![Value::from(id)]]);
        assert_eq!(found, vec![Asset::new(id, "bulk", id as i64, id as i64)]);
    }
    // 8 records in three unique indexes plus the shared time bucket
    assert_eq!(snapshot(&collection).len(), 32);
}
