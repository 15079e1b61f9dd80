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

//! Distributed lock primitives layered over an [`AtomicStore`](crate::store::AtomicStore).
//!
//! [`ExclusiveLock`] holds a key for one token, [`ReentrantLock`] lets one
//! owner enter a key repeatedly. Both share their acquisition strategies
//! through the [`DistributedLock`] trait, which drives a [`RetryPolicy`].

pub mod acquisition;
pub mod cancellation;
pub mod exclusive;
pub mod guard;
pub mod reentrant;
pub mod retry;
pub mod settings;
pub mod ttl;
pub mod wait_observer;

pub use acquisition::PollingBackoff;
pub use cancellation::{CancellationToken, global_token};
pub use exclusive::{ExclusiveLock, FORCE_TOKEN, force_release, force_release_with_token};
pub use guard::LockGuard;
pub use reentrant::{ReentrantLock, UNBOUNDED, force_release_reentrant, normalize_max_count};
pub use retry::{DistributedLock, RetryPolicy};
pub use settings::LockSettings;
pub use ttl::{EXCLUSIVE_TTL_BOUNDS, REENTRANT_TTL_BOUNDS, TtlBounds};
pub use wait_observer::{LockWaitObserver, NoopLockWaitObserver};
