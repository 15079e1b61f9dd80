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

//! Single-holder lock identified by a caller-supplied token.
//!
//! The lock keeps no client-side state between calls: whether it is held,
//! and by whom, lives only in the store record. Tokens are never generated
//! here; uniqueness across concurrent holders is up to the caller.

use crate::config::LockingConfig;
use crate::error::Result;
use crate::locking::cancellation::CancellationToken;
use crate::locking::retry::DistributedLock;
use crate::locking::settings::LockSettings;
use crate::locking::ttl::EXCLUSIVE_TTL_BOUNDS;
use crate::locking::wait_observer::LockWaitObserver;
use crate::store::AtomicStore;
use log::debug;
use std::sync::Arc;

/// Token value that makes a release ignore ownership.
pub const FORCE_TOKEN: &str = "";

pub struct ExclusiveLock {
    store: Arc<dyn AtomicStore>,
    token: String,
    settings: LockSettings,
}

impl ExclusiveLock {
    /// Creates a lock with the empty token. Releasing it force-releases the key.
    ///
    /// Every empty-token lock counts as the same holder: a second anonymous
    /// lock on a key held by another one re-acquires it instead of failing.
    /// Anonymous locks therefore give no mutual exclusion between each other;
    /// use [`ExclusiveLock::with_token`] with distinct tokens for that.
    pub fn new(store: Arc<dyn AtomicStore>, key: impl Into<String>) -> Self {
        Self::with_token(store, key, FORCE_TOKEN)
    }

    pub fn with_token(
        store: Arc<dyn AtomicStore>,
        key: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let defaults = LockingConfig::default();
        Self {
            store,
            token: token.into(),
            settings: LockSettings::new(
                key.into(),
                EXCLUSIVE_TTL_BOUNDS,
                defaults.exclusive_ttl_secs,
            ),
        }
    }

    /// Applies TTL and retry timing from configuration.
    pub fn with_config(mut self, config: &LockingConfig) -> Self {
        self.settings.set_default_ttl(config.exclusive_ttl_secs);
        self.settings.set_timing(config);
        self
    }

    /// Overrides the default TTL; clamped to 1..=10 seconds.
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

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl DistributedLock for ExclusiveLock {
    fn settings(&self) -> &LockSettings {
        &self.settings
    }

    fn attempt(&self, ttl_secs: u64) -> Result<bool> {
        self.store
            .acquire_exclusive(self.settings.key(), &self.token, ttl_secs)
    }

    fn release(&self) -> Result<()> {
        debug!("Releasing exclusive lock '{}'", self.settings.key());
        self.store.release_exclusive(self.settings.key(), &self.token)
    }
}

/// Deletes the record for `key` whoever holds it.
pub fn force_release(store: &dyn AtomicStore, key: &str) -> Result<()> {
    debug!("Force-releasing lock '{key}'");
    store.release_exclusive(key, FORCE_TOKEN)
}

/// Deletes the record for `key` only when `token` holds it.
pub fn force_release_with_token(store: &dyn AtomicStore, key: &str, token: &str) -> Result<()> {
    store.release_exclusive(key, token)
}
