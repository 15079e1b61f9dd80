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

//! Acquisition strategies layered over a lock's single-shot acquire.
//!
//! Only contention (`Ok(false)` from the store) is retried. A store failure
//! ends the loop immediately, and a cancelled sleep ends it with
//! [`LockError::WaitInterrupted`](crate::error::LockError::WaitInterrupted).

use crate::error::Result;
use crate::locking::acquisition::{PollingBackoff, WaitTracker};
use crate::locking::guard::LockGuard;
use crate::locking::settings::LockSettings;
use log::debug;
use std::cmp;
use std::time::Duration;

/// How long and how often to retry a contended lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// A single attempt.
    Once { ttl_secs: u64 },
    /// Retry forever at a fixed interval.
    Blocking { ttl_secs: u64, interval: Duration },
    /// At most `attempts` attempts, sleeping `sleep` after each failure.
    Bounded {
        ttl_secs: u64,
        attempts: u32,
        sleep: Duration,
    },
    /// Retry with exponential backoff until `timeout` has elapsed.
    Deadline {
        ttl_secs: u64,
        timeout: Duration,
        backoff: PollingBackoff,
    },
}

enum Step {
    Sleep(Duration),
    SleepThenGiveUp(Duration),
    GiveUp,
}

impl RetryPolicy {
    pub fn once(ttl_secs: u64) -> Self {
        RetryPolicy::Once { ttl_secs }
    }

    pub fn blocking(ttl_secs: u64, interval: Duration) -> Self {
        RetryPolicy::Blocking { ttl_secs, interval }
    }

    pub fn bounded(ttl_secs: u64, attempts: u32, sleep: Duration) -> Self {
        RetryPolicy::Bounded {
            ttl_secs,
            attempts,
            sleep,
        }
    }

    pub fn deadline(ttl_secs: u64, timeout: Duration) -> Self {
        RetryPolicy::Deadline {
            ttl_secs,
            timeout,
            backoff: PollingBackoff::default(),
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        match self {
            RetryPolicy::Once { ttl_secs }
            | RetryPolicy::Blocking { ttl_secs, .. }
            | RetryPolicy::Bounded { ttl_secs, .. }
            | RetryPolicy::Deadline { ttl_secs, .. } => *ttl_secs,
        }
    }

    /// Runs the policy against `lock`. The TTL is clamped to the lock's bounds.
    ///
    /// Returns `Ok(true)` once acquired and `Ok(false)` when the policy gave up.
    /// A blocking policy only ever returns `Ok(true)` or an error.
    pub fn execute<L: DistributedLock + ?Sized>(&self, lock: &L) -> Result<bool> {
        let settings = lock.settings();
        let key = settings.key();
        let ttl_secs = settings.bounds().clamp(self.ttl_secs());

        if let RetryPolicy::Bounded { attempts: 0, .. } = self {
            return Ok(false);
        }

        let mut backoff = match self {
            RetryPolicy::Deadline { backoff, .. } => backoff.clone(),
            _ => PollingBackoff::default(),
        };
        let mut tracker = WaitTracker::new(key, settings.cancellation(), settings.observer());

        loop {
            tracker.record_attempt();
            if lock.attempt(ttl_secs)? {
                debug!(
                    "Acquired lock '{key}' (ttl {ttl_secs}s) after {} attempt(s) in {:.3}s",
                    tracker.attempts(),
                    tracker.elapsed().as_secs_f64()
                );
                tracker.notify_acquired();
                return Ok(true);
            }

            let step = match self {
                RetryPolicy::Once { .. } => Step::GiveUp,
                RetryPolicy::Blocking { interval, .. } => Step::Sleep(*interval),
                RetryPolicy::Bounded {
                    attempts, sleep, ..
                } => {
                    if tracker.attempts() >= *attempts as usize {
                        Step::SleepThenGiveUp(*sleep)
                    } else {
                        Step::Sleep(*sleep)
                    }
                }
                RetryPolicy::Deadline { timeout, .. } => {
                    let remaining = timeout.saturating_sub(tracker.elapsed());
                    let delay = cmp::min(backoff.next_delay(), remaining);
                    if delay.is_zero() {
                        Step::GiveUp
                    } else {
                        Step::Sleep(delay)
                    }
                }
            };

            match step {
                Step::Sleep(delay) => tracker.pause(delay)?,
                Step::SleepThenGiveUp(delay) => {
                    tracker.pause(delay)?;
                    break;
                }
                Step::GiveUp => break,
            }
        }

        debug!(
            "Gave up on lock '{key}' after {} attempt(s) in {:.3}s",
            tracker.attempts(),
            tracker.elapsed().as_secs_f64()
        );
        tracker.notify_exhausted();
        Ok(false)
    }
}

/// A lock with a single-shot acquire primitive. Every acquisition strategy is
/// derived from [`DistributedLock::attempt`].
pub trait DistributedLock {
    fn settings(&self) -> &LockSettings;

    /// One round-trip to the store with an already clamped TTL.
    fn attempt(&self, ttl_secs: u64) -> Result<bool>;

    /// Releases this instance's hold. A hold owned by someone else is left alone.
    fn release(&self) -> Result<()>;

    fn key(&self) -> &str {
        self.settings().key()
    }

    /// One attempt at the default TTL.
    fn try_acquire(&self) -> Result<bool> {
        RetryPolicy::once(self.settings().default_ttl_secs()).execute(self)
    }

    /// One attempt with `ttl_secs` clamped to the lock's bounds.
    fn try_acquire_with_ttl(&self, ttl_secs: u64) -> Result<bool> {
        RetryPolicy::once(ttl_secs).execute(self)
    }

    /// One attempt with a TTL derived from `duration` (whole seconds, clamped).
    fn try_acquire_for(&self, duration: Duration) -> Result<bool> {
        let ttl_secs = self.settings().bounds().clamp_duration(duration);
        RetryPolicy::once(ttl_secs).execute(self)
    }

    /// Polls until acquired. Only cancellation or a store failure ends the wait early.
    fn acquire_blocking(&self) -> Result<()> {
        let timing = self.settings().timing();
        RetryPolicy::blocking(timing.blocking_ttl_secs, timing.poll_interval())
            .execute(self)
            .map(|_| ())
    }

    /// Up to `retry_times` attempts at the default TTL, sleeping `retry_sleep`
    /// after each failure. Worst case takes `retry_times * retry_sleep`.
    fn acquire_bounded(&self, retry_times: u32, retry_sleep: Duration) -> Result<bool> {
        RetryPolicy::bounded(self.settings().default_ttl_secs(), retry_times, retry_sleep)
            .execute(self)
    }

    /// [`DistributedLock::acquire_bounded`] with the configured retry defaults.
    fn acquire_with_retry(&self) -> Result<bool> {
        let timing = self.settings().timing();
        self.acquire_bounded(timing.retry_times, timing.retry_sleep())
    }

    /// Polls with exponential backoff until acquired or `timeout` elapses.
    fn acquire_within(&self, timeout: Duration) -> Result<bool> {
        RetryPolicy::deadline(self.settings().default_ttl_secs(), timeout).execute(self)
    }

    /// Blocks until acquired and returns a guard that releases on drop.
    fn acquire_guard(&self) -> Result<LockGuard<'_, Self>>
    where
        Self: Sized,
    {
        self.acquire_blocking()?;
        Ok(LockGuard::new(self))
    }
}
