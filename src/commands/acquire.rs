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

use crate::commands::feedback::WaitFeedback;
use crate::commands::open_store;
use crate::config::{KvlockConfig, LockingConfig};
use crate::error::Result;
use crate::locking::{DistributedLock, ExclusiveLock, RetryPolicy, global_token};
use crate::store::AtomicStore;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// How `kvlock acquire` should treat a held key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireMode {
    /// Single attempt.
    Once,
    /// Bounded retries; `None` fields fall back to `[locking]` settings.
    Retry {
        times: Option<u32>,
        sleep_ms: Option<u64>,
    },
    /// Poll until acquired or interrupted.
    Wait,
}

pub struct AcquireCommand {
    store: Arc<dyn AtomicStore>,
    locking: LockingConfig,
}

impl AcquireCommand {
    pub fn new(config: &KvlockConfig) -> Result<Self> {
        Ok(Self::with_store(open_store(config)?, config.locking))
    }

    pub fn with_store(store: Arc<dyn AtomicStore>, locking: LockingConfig) -> Self {
        Self { store, locking }
    }

    /// Acquires `key` and prints the holder token. Returns `false` when the key stayed busy.
    pub fn execute(
        &self,
        key: &str,
        token: Option<&str>,
        ttl: Option<u64>,
        mode: AcquireMode,
    ) -> Result<bool> {
        let token = token
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut lock = ExclusiveLock::with_token(self.store.clone(), key, token.as_str())
            .with_config(&self.locking)
            .with_observer(Arc::new(WaitFeedback::stderr()));
        if let Some(ttl) = ttl {
            lock = lock.with_default_ttl(ttl);
        }

        let policy = match mode {
            AcquireMode::Once => RetryPolicy::once(lock.settings().default_ttl_secs()),
            AcquireMode::Retry { times, sleep_ms } => RetryPolicy::bounded(
                lock.settings().default_ttl_secs(),
                times.unwrap_or(self.locking.retry_times),
                sleep_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| self.locking.retry_sleep()),
            ),
            AcquireMode::Wait => {
                lock = lock.with_cancellation(global_token());
                RetryPolicy::blocking(
                    ttl.unwrap_or(self.locking.blocking_ttl_secs),
                    self.locking.poll_interval(),
                )
            }
        };

        if !policy.execute(&lock)? {
            eprintln!("Lock '{key}' is busy");
            return Ok(false);
        }

        info!("Acquired lock '{key}' with token {token}");
        println!("{token}");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LockKind, MemoryStore};
    use std::time::Instant;

    fn command() -> (Arc<MemoryStore>, AcquireCommand) {
        let store = Arc::new(MemoryStore::new());
        let command = AcquireCommand::with_store(store.clone(), LockingConfig::default());
        (store, command)
    }

    #[test]
    fn acquires_with_given_token() {
        let (store, command) = command();

        assert!(command.execute("jobs", Some("t1"), None, AcquireMode::Once).unwrap());
        let record = store.inspect("jobs").unwrap().unwrap();
        assert_eq!(record.kind, LockKind::Exclusive);
        assert_eq!(record.held_by, "t1");
    }

    #[test]
    fn generates_token_when_missing() {
        let (store, command) = command();

        assert!(command.execute("jobs", None, Some(5), AcquireMode::Once).unwrap());
        let record = store.inspect("jobs").unwrap().unwrap();
        assert!(Uuid::parse_str(&record.held_by).is_ok());
    }

    #[test]
    fn busy_key_reports_false() {
        let (_store, command) = command();

        assert!(command.execute("jobs", Some("t1"), Some(10), AcquireMode::Once).unwrap());
        assert!(!command.execute("jobs", Some("t2"), None, AcquireMode::Once).unwrap());
    }

    #[test]
    fn retry_mode_uses_given_schedule() {
        let (_store, command) = command();
        assert!(command.execute("jobs", Some("t1"), Some(10), AcquireMode::Once).unwrap());

        let started = Instant::now();
        let mode = AcquireMode::Retry {
            times: Some(2),
            sleep_ms: Some(50),
        };
        assert!(!command.execute("jobs", Some("t2"), None, mode).unwrap());
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn wait_mode_acquires_free_key() {
        let (store, command) = command();

        assert!(command.execute("jobs", Some("t1"), None, AcquireMode::Wait).unwrap());
        assert_eq!(store.inspect("jobs").unwrap().unwrap().held_by, "t1");
    }
}
