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

use crate::error::{LockError, Result};
use crate::store::AtomicStore;
use crate::store::clock::{Clock, SystemClock};
use crate::store::record::{self, LockRecord, Transition};
use chrono::{DateTime, Utc};
use log::trace;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Store living inside the current process.
///
/// Coordinates threads of one process only. Useful for tests and for
/// embedding the lock protocol where a single process owns every contender.
pub struct MemoryStore {
    records: Mutex<HashMap<String, LockRecord>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Runs `evaluate` against the live record for `key` while holding the map lock.
    fn apply<T>(
        &self,
        operation: &'static str,
        key: &str,
        evaluate: impl FnOnce(Option<&LockRecord>, DateTime<Utc>) -> (T, Transition),
    ) -> Result<T> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| LockError::store_unavailable(operation, key, "record map poisoned"))?;

        let now = self.clock.now();
        if records.get(key).is_some_and(|record| record.is_expired(now)) {
            trace!("Dropping expired record for '{key}'");
            records.remove(key);
        }

        let (outcome, transition) = evaluate(records.get(key), now);
        match transition {
            Transition::Unchanged => {}
            Transition::Write(updated) => {
                records.insert(key.to_string(), updated);
            }
            Transition::Delete => {
                records.remove(key);
            }
        }
        Ok(outcome)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicStore for MemoryStore {
    fn acquire_exclusive(&self, key: &str, token: &str, ttl_secs: u64) -> Result<bool> {
        self.apply("acquire_exclusive", key, |live, now| {
            record::acquire_exclusive(live, key, token, ttl_secs, now)
        })
    }

    fn release_exclusive(&self, key: &str, token: &str) -> Result<()> {
        self.apply("release_exclusive", key, |live, _| {
            ((), record::release_exclusive(live, token))
        })
    }

    fn acquire_reentrant(
        &self,
        key: &str,
        owner_id: &str,
        max_count: i64,
        ttl_secs: u64,
    ) -> Result<bool> {
        self.apply("acquire_reentrant", key, |live, now| {
            record::acquire_reentrant(live, key, owner_id, max_count, ttl_secs, now)
        })
    }

    fn release_reentrant(&self, key: &str, owner_id: &str) -> Result<()> {
        self.apply("release_reentrant", key, |live, _| {
            ((), record::release_reentrant(live, owner_id))
        })
    }

    fn inspect(&self, key: &str) -> Result<Option<LockRecord>> {
        self.apply("inspect", key, |live, _| (live.cloned(), Transition::Unchanged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::clock::ManualClock;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn store_with_clock() -> (MemoryStore, ManualClock) {
        let clock = ManualClock::new();
        (MemoryStore::with_clock(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn only_one_token_wins_a_race() {
        let store = Arc::new(MemoryStore::new());
        let contenders = 16;
        let barrier = Arc::new(Barrier::new(contenders));

        let handles: Vec<_> = (0..contenders)
            .map(|idx| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .acquire_exclusive("orders", &format!("token-{idx}"), 10)
                        .unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|acquired| *acquired)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn expired_record_is_acquirable_by_another_token() {
        let (store, clock) = store_with_clock();
        assert!(store.acquire_exclusive("orders", "crashed", 2).unwrap());
        assert!(!store.acquire_exclusive("orders", "next", 2).unwrap());

        clock.advance(Duration::from_secs(2));
        assert!(store.inspect("orders").unwrap().is_none());
        assert!(store.acquire_exclusive("orders", "next", 2).unwrap());
    }

    #[test]
    fn unauthorized_release_leaves_record_untouched() {
        let (store, _clock) = store_with_clock();
        store.acquire_exclusive("orders", "owner", 5).unwrap();
        let before = store.inspect("orders").unwrap();

        store.release_exclusive("orders", "intruder").unwrap();
        store.release_reentrant("orders", "owner").unwrap();
        assert_eq!(store.inspect("orders").unwrap(), before);
    }

    #[test]
    fn reentrant_counting_cycle() {
        let (store, _clock) = store_with_clock();
        for _ in 0..3 {
            assert!(store.acquire_reentrant("jobs", "owner", 3, 3).unwrap());
        }
        assert!(!store.acquire_reentrant("jobs", "owner", 3, 3).unwrap());

        store.release_reentrant("jobs", "owner").unwrap();
        store.release_reentrant("jobs", "owner").unwrap();
        assert_eq!(store.inspect("jobs").unwrap().unwrap().count, 1);
        assert!(!store.acquire_reentrant("jobs", "other", 3, 3).unwrap());

        store.release_reentrant("jobs", "owner").unwrap();
        assert!(store.inspect("jobs").unwrap().is_none());
        assert!(store.acquire_reentrant("jobs", "other", 3, 3).unwrap());
    }

    #[test]
    fn force_release_ignores_holder() {
        let (store, _clock) = store_with_clock();
        store.acquire_reentrant("jobs", "owner", -1, 3).unwrap();
        store.release_exclusive("jobs", "").unwrap();
        assert!(store.inspect("jobs").unwrap().is_none());
    }
}
