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

//! Owner-keyed lock that the same owner may enter repeatedly.
//!
//! The store keeps the entry count; each successful acquire by the owner
//! increments it and refreshes the TTL, each release decrements it and the
//! record disappears when the count reaches zero. A partial release does not
//! touch the TTL, so a long nested section can still lose the lock to expiry.

use crate::config::LockingConfig;
use crate::error::Result;
use crate::locking::cancellation::CancellationToken;
use crate::locking::retry::DistributedLock;
use crate::locking::settings::LockSettings;
use crate::locking::ttl::REENTRANT_TTL_BOUNDS;
use crate::locking::wait_observer::LockWaitObserver;
use crate::store::AtomicStore;
use log::debug;
use std::sync::Arc;

/// Reentry cap meaning "no limit".
pub const UNBOUNDED: i64 = -1;

/// Maps any value below `-1` to unbounded and `0` to `1`.
pub fn normalize_max_count(max_count: i64) -> i64 {
    match max_count {
        value if value < UNBOUNDED => UNBOUNDED,
        0 => 1,
        value => value,
    }
}

pub struct ReentrantLock {
    store: Arc<dyn AtomicStore>,
    owner_id: String,
    max_count: i64,
    settings: LockSettings,
}

impl ReentrantLock {
    pub fn new(
        store: Arc<dyn AtomicStore>,
        key: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        let defaults = LockingConfig::default();
        Self {
            store,
            owner_id: owner_id.into(),
            max_count: UNBOUNDED,
            settings: LockSettings::new(
                key.into(),
                REENTRANT_TTL_BOUNDS,
                defaults.reentrant_ttl_secs,
            ),
        }
    }

    /// Caps how many times the owner may hold the lock at once. `1` makes it non-reentrant.
    pub fn with_max_count(mut self, max_count: i64) -> Self {
        self.max_count = normalize_max_count(max_count);
        self
    }

    pub fn with_config(mut self, config: &LockingConfig) -> Self {
        self.settings.set_default_ttl(config.reentrant_ttl_secs);
        self.settings.set_timing(config);
        self
    }

    /// Overrides the default TTL; clamped to 3..=10 seconds.
    pub fn with_default_ttl(mut self, ttl_secs: u64) -> Self {
        self.settings.set_default_ttl(ttl_secs);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.settings.set_cancellation(cancellation);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LockWaitObserver>) -> Self {
        self.settings.set_observer(observer);
        self
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn max_count(&self) -> i64 {
        self.max_count
    }
}

impl DistributedLock for ReentrantLock {
    fn settings(&self) -> &LockSettings {
        &self.settings
    }

    fn attempt(&self, ttl_secs: u64) -> Result<bool> {
        self.store.acquire_reentrant(
            self.settings.key(),
            &self.owner_id,
            self.max_count,
            ttl_secs,
        )
    }

    fn release(&self) -> Result<()> {
        debug!(
            "Releasing one hold of reentrant lock '{}' for owner '{}'",
            self.settings.key(),
            self.owner_id
        );
        self.store.release_reentrant(self.settings.key(), &self.owner_id)
    }
}

/// Releases one hold of `owner_id` on `key` without a lock instance.
pub fn force_release_reentrant(
    store: &dyn AtomicStore,
    key: &str,
    owner_id: &str,
) -> Result<()> {
    store.release_reentrant(key, owner_id)
}
