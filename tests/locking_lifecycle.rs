// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod common;

use common::TestHome;
use kvlock::error::LockError;
use kvlock::locking::{
    CancellationToken, DistributedLock, ExclusiveLock, ReentrantLock, force_release,
};
use kvlock::store::{AtomicStore, FileStore, LockKind};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn shared_store(home: &TestHome) -> Arc<dyn AtomicStore> {
    Arc::new(home.open_store())
}

#[test]
fn exclusive_lock_excludes_across_store_handles() {
    let home = TestHome::new();
    let workers = 6;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|idx| {
            let dir = home.store_dir();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let store: Arc<dyn AtomicStore> = Arc::new(FileStore::open(dir).unwrap());
                let lock = ExclusiveLock::with_token(store, "orders", format!("worker-{idx}"))
                    .with_default_ttl(10);
                barrier.wait();
                lock.try_acquire().unwrap()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|acquired| *acquired)
        .count();
    assert_eq!(winners, 1);

    let record = home.open_store().inspect("orders").unwrap().unwrap();
    assert_eq!(record.kind, LockKind::Exclusive);
    assert!(record.held_by.starts_with("worker-"));
}

#[test]
fn crashed_holder_is_recovered_after_ttl() {
    let home = TestHome::new();
    let store = shared_store(&home);

    let crashed = ExclusiveLock::with_token(store.clone(), "orders", "crashed");
    assert!(crashed.try_acquire_with_ttl(1).unwrap());
    drop(crashed);

    let next = ExclusiveLock::with_token(store.clone(), "orders", "next");
    assert!(!next.try_acquire().unwrap());

    thread::sleep(Duration::from_millis(1_100));
    assert!(next.try_acquire().unwrap());
    assert_eq!(store.inspect("orders").unwrap().unwrap().held_by, "next");
}

#[test]
fn blocking_waiter_takes_over_after_release() {
    let home = TestHome::new();
    let store = shared_store(&home);

    let holder = ExclusiveLock::with_token(store.clone(), "orders", "holder");
    assert!(holder.try_acquire_with_ttl(10).unwrap());

    let waiter_store = store.clone();
    let waiter = thread::spawn(move || {
        let waiter = ExclusiveLock::with_token(waiter_store, "orders", "waiter");
        let started = Instant::now();
        waiter.acquire_blocking().unwrap();
        started.elapsed()
    });

    thread::sleep(Duration::from_millis(250));
    holder.release().unwrap();

    let waited = waiter.join().unwrap();
    assert!(waited >= Duration::from_millis(200));
    assert_eq!(store.inspect("orders").unwrap().unwrap().held_by, "waiter");
}

#[test]
fn cancelled_blocking_wait_reports_interruption() {
    let home = TestHome::new();
    let store = shared_store(&home);
    assert!(store.acquire_exclusive("orders", "holder", 10).unwrap());

    let cancellation = CancellationToken::new();
    let waiter = ExclusiveLock::with_token(store.clone(), "orders", "waiter")
        .with_cancellation(cancellation.clone());
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        cancellation.cancel();
    });

    let err = waiter.acquire_blocking().unwrap_err();
    canceller.join().unwrap();
    assert!(matches!(err, LockError::WaitInterrupted { ref key, .. } if key == "orders"));
    assert_eq!(store.inspect("orders").unwrap().unwrap().held_by, "holder");
}

#[test]
fn bounded_retry_gives_up_after_schedule() {
    let home = TestHome::new();
    let store = shared_store(&home);
    assert!(store.acquire_exclusive("orders", "holder", 10).unwrap());

    let waiter = ExclusiveLock::with_token(store, "orders", "waiter");
    let started = Instant::now();
    assert!(!waiter.acquire_bounded(3, Duration::from_millis(100)).unwrap());
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[test]
fn reentrant_lifecycle_on_file_store() {
    let home = TestHome::new();
    let store = shared_store(&home);
    let owner = ReentrantLock::new(store.clone(), "batch", "owner").with_max_count(3);
    let other = ReentrantLock::new(store.clone(), "batch", "other");

    for expected in 1..=3 {
        assert!(owner.try_acquire().unwrap());
        assert_eq!(store.inspect("batch").unwrap().unwrap().count, expected);
    }
    assert!(!owner.try_acquire().unwrap());
    assert!(!other.try_acquire().unwrap());

    other.release().unwrap();
    assert_eq!(store.inspect("batch").unwrap().unwrap().count, 3);

    for _ in 0..3 {
        owner.release().unwrap();
    }
    assert!(store.inspect("batch").unwrap().is_none());
    assert!(other.try_acquire().unwrap());
}

#[test]
fn guard_releases_on_drop() {
    let home = TestHome::new();
    let store = shared_store(&home);
    let lock = ExclusiveLock::with_token(store.clone(), "orders", "scoped");

    {
        let guard = lock.acquire_guard().unwrap();
        assert_eq!(guard.key(), "orders");
        assert!(store.inspect("orders").unwrap().is_some());
    }

    assert!(store.inspect("orders").unwrap().is_none());
}

#[test]
fn force_release_clears_any_holder() {
    let home = TestHome::new();
    let store = shared_store(&home);
    assert!(store.acquire_reentrant("batch", "owner", -1, 5).unwrap());
    assert!(store.acquire_reentrant("batch", "owner", -1, 5).unwrap());

    force_release(store.as_ref(), "batch").unwrap();
    assert!(store.inspect("batch").unwrap().is_none());
}

#[test]
fn sweep_reclaims_expired_records() {
    let home = TestHome::new();
    let store = home.open_store();
    assert!(store.acquire_exclusive("short", "t1", 1).unwrap());
    assert!(store.acquire_exclusive("long", "t2", 10).unwrap());

    thread::sleep(Duration::from_millis(1_100));
    let report = store.sweep_expired().unwrap();

    assert_eq!(report.removed_records, 1);
    assert_eq!(report.errors, 0);
    assert!(store.inspect("long").unwrap().is_some());
}
