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

use crate::config::LockingConfig;
use crate::locking::cancellation::CancellationToken;
use crate::locking::ttl::TtlBounds;
use crate::locking::wait_observer::LockWaitObserver;
use std::sync::Arc;

/// Per-instance configuration shared by both lock flavours.
#[derive(Clone)]
pub struct LockSettings {
    key: String,
    bounds: TtlBounds,
    default_ttl_secs: u64,
    timing: LockingConfig,
    cancellation: CancellationToken,
    observer: Option<Arc<dyn LockWaitObserver>>,
}

impl LockSettings {
    pub(crate) fn new(key: String, bounds: TtlBounds, default_ttl_secs: u64) -> Self {
        Self {
            key,
            bounds,
            default_ttl_secs: bounds.clamp(default_ttl_secs),
            timing: LockingConfig::default(),
            cancellation: CancellationToken::new(),
            observer: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn bounds(&self) -> TtlBounds {
        self.bounds
    }

    /// TTL used by single attempts and bounded retries, already within bounds.
    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    pub fn timing(&self) -> &LockingConfig {
        &self.timing
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn observer(&self) -> Option<&dyn LockWaitObserver> {
        self.observer.as_deref()
    }

    pub(crate) fn set_default_ttl(&mut self, ttl_secs: u64) {
        self.default_ttl_secs = self.bounds.clamp(ttl_secs);
    }

    pub(crate) fn set_timing(&mut self, timing: &LockingConfig) {
        self.timing = *timing;
    }

    pub(crate) fn set_cancellation(&mut self, cancellation: CancellationToken) {
        self.cancellation = cancellation;
    }

    pub(crate) fn set_observer(&mut self, observer: Arc<dyn LockWaitObserver>) {
        self.observer = Some(observer);
    }
}
