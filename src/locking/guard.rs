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

use crate::error::Result;
use crate::locking::retry::DistributedLock;
use log::warn;

/// Releases the wrapped lock when dropped.
///
/// The store record still expires on its own TTL; the guard does not renew it.
pub struct LockGuard<'a, L: DistributedLock> {
    lock: &'a L,
    released: bool,
}

impl<'a, L: DistributedLock> LockGuard<'a, L> {
    /// Wraps a lock the caller has already acquired.
    pub fn new(lock: &'a L) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    pub fn key(&self) -> &str {
        self.lock.key()
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.lock.release()
    }
}

impl<L: DistributedLock> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.lock.release() {
            warn!("Failed to release lock '{}': {err}", self.lock.key());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locking::ExclusiveLock;
    use crate::store::{AtomicStore, MemoryStore};
    use std::sync::Arc;

    #[test]
    fn guard_release_allows_reacquire() {
        let store = Arc::new(MemoryStore::new());
        let lock = ExclusiveLock::with_token(store.clone(), "orders", "first");
        {
            let guard = lock.acquire_guard().unwrap();
            assert_eq!(guard.key(), "orders");
            assert!(store.inspect("orders").unwrap().is_some());
        }
        assert!(store.inspect("orders").unwrap().is_none());

        let other = ExclusiveLock::with_token(store, "orders", "second");
        assert!(other.try_acquire().unwrap());
    }

    #[test]
    fn explicit_release_returns_ok() {
        let store = Arc::new(MemoryStore::new());
        let lock = ExclusiveLock::with_token(store.clone(), "orders", "first");
        let guard = lock.acquire_guard().unwrap();
        guard.release().unwrap();
        assert!(store.inspect("orders").unwrap().is_none());
    }
}
