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

use crate::commands::open_store;
use crate::config::{KvlockConfig, LockingConfig};
use crate::error::Result;
use crate::locking::{DistributedLock, ReentrantLock, UNBOUNDED};
use crate::store::{AtomicStore, LockKind};
use std::sync::Arc;

/// `kvlock enter` and `kvlock exit`.
pub struct ReentrantCommand {
    store: Arc<dyn AtomicStore>,
    locking: LockingConfig,
}

impl ReentrantCommand {
    pub fn new(config: &KvlockConfig) -> Result<Self> {
        Ok(Self::with_store(open_store(config)?, config.locking))
    }

    pub fn with_store(store: Arc<dyn AtomicStore>, locking: LockingConfig) -> Self {
        Self { store, locking }
    }

    /// Takes one more hold for `owner` and prints the resulting count.
    pub fn enter(
        &self,
        key: &str,
        owner: &str,
        max_count: Option<i64>,
        ttl: Option<u64>,
    ) -> Result<bool> {
        let mut lock = ReentrantLock::new(self.store.clone(), key, owner)
            .with_config(&self.locking)
            .with_max_count(max_count.unwrap_or(UNBOUNDED));
        if let Some(ttl) = ttl {
            lock = lock.with_default_ttl(ttl);
        }

        if !lock.try_acquire()? {
            eprintln!("Lock '{key}' is busy");
            return Ok(false);
        }

        let count = self.store.inspect(key)?.map(|record| record.count).unwrap_or(0);
        println!("{count}");
        Ok(true)
    }

    /// Drops one hold of `owner`, prints the remaining count and returns it.
    pub fn exit(&self, key: &str, owner: &str) -> Result<u64> {
        ReentrantLock::new(self.store.clone(), key, owner).release()?;

        let count = self
            .store
            .inspect(key)?
            .filter(|record| record.kind == LockKind::Reentrant && record.held_by == owner)
            .map(|record| record.count)
            .unwrap_or(0);
        println!("{count}");
        Ok(count)
    }
}
