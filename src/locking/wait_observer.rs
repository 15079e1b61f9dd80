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

//! Observer interfaces for lock wait instrumentation.
//!
//! Observers decouple the retry loop from user-facing feedback so callers can
//! surface contention without duplicating polling logic.

use std::time::Duration;

/// Observer hooks for lock wait events. Every hook defaults to a no-op.
pub trait LockWaitObserver: Send + Sync {
    /// First failed attempt; the caller is about to sleep.
    fn on_wait_start(&self, _key: &str) {}

    /// Attempt number `attempt` (1-based) is about to be made after a sleep.
    fn on_retry(&self, _key: &str, _attempt: usize, _elapsed: Duration) {}

    fn on_acquired(&self, _key: &str, _attempts: usize, _waited: Duration) {}

    /// The policy ran out of attempts or time without acquiring.
    fn on_exhausted(&self, _key: &str, _attempts: usize, _waited: Duration) {}

    fn on_cancelled(&self, _key: &str, _waited: Duration) {}
}

/// Observer implementation that performs no work.
#[derive(Debug, Default)]
pub struct NoopLockWaitObserver;

impl LockWaitObserver for NoopLockWaitObserver {}
