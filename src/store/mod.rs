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

//! The atomic operations a shared backend must provide to arbitrate locks.
//!
//! Every operation is evaluated as one indivisible check-then-mutate step
//! against a single key. A store that cannot evaluate an operation reports
//! [`LockError::StoreUnavailable`](crate::error::LockError::StoreUnavailable);
//! it never answers `false` on behalf of a failure.

pub mod clock;
pub mod file;
pub mod memory;
pub mod record;

pub use clock::{Clock, ManualClock, SystemClock};
pub use file::{FileStore, SweepReport};
pub use memory::MemoryStore;
pub use record::{LockKind, LockRecord};

use crate::error::Result;

/// Minimal atomic contract required from the shared key-value store.
pub trait AtomicStore: Send + Sync {
    /// Creates the record if absent, or refreshes it when `token` already holds it.
    fn acquire_exclusive(&self, key: &str, token: &str, ttl_secs: u64) -> Result<bool>;

    /// Deletes the record when `token` holds it. An empty token deletes unconditionally.
    fn release_exclusive(&self, key: &str, token: &str) -> Result<()>;

    /// Creates the record with count 1, or increments the count of `owner_id`
    /// while it stays within `max_count` (`-1` for unbounded).
    fn acquire_reentrant(
        &self,
        key: &str,
        owner_id: &str,
        max_count: i64,
        ttl_secs: u64,
    ) -> Result<bool>;

    /// Decrements the count held by `owner_id`, deleting the record at zero.
    fn release_reentrant(&self, key: &str, owner_id: &str) -> Result<()>;

    /// Returns the live record for `key`, if any. Never changes a live record,
    /// but an expired one may be deleted on the way, as every operation does.
    fn inspect(&self, key: &str) -> Result<Option<LockRecord>>;
}
