//! Concurrency tests: readers and compaction racing the ledger's writes on
//! a file store whose cache is smaller than its working set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use subscription_ledger::{ActivityId, Store, StoreConfig, UserId};
use tempfile::TempDir;

const WRITES: usize = 2000;

fn tiny_cache_store(dir: &TempDir) -> Arc<Store> {
    Arc::new(
        Store::create(StoreConfig {
            path: dir.path().join("store"),
            cache_size: 1,
            create_if_missing: true,
            sync_interval: 1000,
        })
        .unwrap(),
    )
}

/// Spawn threads that keep reading both users until `done` is set.
fn spawn_readers(
    store: &Arc<Store>,
    users: &[UserId],
    done: &Arc<AtomicBool>,
) -> Vec<thread::JoinHandle<()>> {
    (0..3)
        .map(|_| {
            let store = Arc::clone(store);
            let users = users.to_vec();
            let done = Arc::clone(done);
            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    for user in &users {
                        store.ledger().get_activity_ids_subscribed_to(user).unwrap();
                    }
                }
            })
        })
        .collect()
}

fn write_alternating(store: &Store, users: &[UserId]) {
    for i in 0..WRITES {
        let user = &users[i % users.len()];
        store
            .ledger()
            .subscribe_to_activity(user, &ActivityId::from(format!("a{}", i)))
            .unwrap();
    }
}

fn assert_nothing_lost(store: &Store, users: &[UserId]) {
    for (n, user) in users.iter().enumerate() {
        let expected: Vec<ActivityId> = (0..WRITES)
            .filter(|i| i % users.len() == n)
            .map(|i| ActivityId::from(format!("a{}", i)))
            .collect();
        assert_eq!(store.ledger().get_activity_ids_subscribed_to(user).unwrap(), expected);
    }
}

#[test]
fn test_concurrent_readers_do_not_lose_subscriptions() {
    let dir = TempDir::new().unwrap();
    let store = tiny_cache_store(&dir);
    let users = vec![UserId::from("u"), UserId::from("v")];

    let done = Arc::new(AtomicBool::new(false));
    let readers = spawn_readers(&store, &users, &done);

    write_alternating(&store, &users);
    done.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }

    assert_nothing_lost(&store, &users);
}

#[test]
fn test_compaction_during_reads_and_writes() {
    let dir = TempDir::new().unwrap();
    let store = tiny_cache_store(&dir);
    let users = vec![UserId::from("u"), UserId::from("v")];

    let done = Arc::new(AtomicBool::new(false));
    let mut workers = spawn_readers(&store, &users, &done);
    {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        workers.push(thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                store.compact().unwrap();
            }
        }));
    }

    write_alternating(&store, &users);
    done.store(true, Ordering::Relaxed);
    for worker in workers {
        worker.join().unwrap();
    }

    assert_nothing_lost(&store, &users);
    drop(store);

    let reopened = Store::open(StoreConfig {
        path: dir.path().join("store"),
        cache_size: 1,
        create_if_missing: false,
        sync_interval: 1000,
    })
    .unwrap();
    assert_nothing_lost(&reopened, &users);
}
