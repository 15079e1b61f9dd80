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

use crate::error::{LockError, Result};
use crate::locking::cancellation::CancellationToken;
use crate::locking::wait_observer::LockWaitObserver;
use log::trace;
use std::cmp;
use std::time::{Duration, Instant};

/// Exponential backoff configuration used while polling against a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingBackoff {
    initial: Duration,
    factor: u32,
    cap: Duration,
    current: Duration,
}

impl PollingBackoff {
    pub fn new(initial: Duration, factor: u32, cap: Duration) -> Self {
        Self {
            initial,
            factor: cmp::max(factor, 1),
            cap,
            current: initial,
        }
    }

    /// Returns the current delay and advances the backoff sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.current.saturating_mul(self.factor);
        self.current = cmp::min(next, self.cap);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    pub fn peek(&self) -> Duration {
        self.current
    }
}

impl Default for PollingBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(10), 2, Duration::from_millis(1_000))
    }
}

/// Book-keeping for one acquisition call: attempt count, elapsed time,
/// cancellation and observer notifications.
pub(crate) struct WaitTracker<'a> {
    key: &'a str,
    started_at: Instant,
    attempts: usize,
    cancellation: &'a CancellationToken,
    observer: Option<&'a dyn LockWaitObserver>,
    wait_started: bool,
}

impl<'a> WaitTracker<'a> {
    pub(crate) fn new(
        key: &'a str,
        cancellation: &'a CancellationToken,
        observer: Option<&'a dyn LockWaitObserver>,
    ) -> Self {
        Self {
            key,
            started_at: Instant::now(),
            attempts: 0,
            cancellation,
            observer,
            wait_started: false,
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
        if self.attempts > 1
            && let Some(observer) = self.observer
        {
            observer.on_retry(self.key, self.attempts, self.elapsed());
        }
    }

    /// Sleeps before the next attempt, surfacing cancellation as an error.
    pub(crate) fn pause(&mut self, delay: Duration) -> Result<()> {
        if !self.wait_started {
            self.wait_started = true;
            if let Some(observer) = self.observer {
                observer.on_wait_start(self.key);
            }
        }

        trace!(
            "Lock '{}' busy after attempt {}; sleeping {}ms",
            self.key,
            self.attempts,
            delay.as_millis()
        );
        if self.cancellation.sleep(delay) {
            return Ok(());
        }

        let waited = self.elapsed();
        if let Some(observer) = self.observer {
            observer.on_cancelled(self.key, waited);
        }
        Err(LockError::WaitInterrupted {
            key: self.key.to_string(),
            waited_secs: waited.as_secs_f64(),
        })
    }

    pub(crate) fn notify_acquired(&self) {
        if let Some(observer) = self.observer {
            observer.on_acquired(self.key, self.attempts, self.elapsed());
        }
    }

    pub(crate) fn notify_exhausted(&self) {
        if let Some(observer) = self.observer {
            observer.on_exhausted(self.key, self.attempts, self.elapsed());
        }
    }
}
