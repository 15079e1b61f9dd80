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

//! Stderr feedback for CLI invocations that wait on a contended lock.

use crate::locking::LockWaitObserver;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Observer that reports lock waits as plain lines on a writer, stderr by default.
pub struct WaitFeedback {
    sink: Mutex<Box<dyn Write + Send>>,
    interval: Duration,
    last_emit: Mutex<Option<Instant>>,
}

impl WaitFeedback {
    pub fn stderr() -> Self {
        Self::with_sink(Box::new(io::stderr()), PROGRESS_INTERVAL)
    }

    pub fn with_sink(sink: Box<dyn Write + Send>, interval: Duration) -> Self {
        Self {
            sink: Mutex::new(sink),
            interval,
            last_emit: Mutex::new(None),
        }
    }

    fn emit_line(&self, message: &str) {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(sink, "{message}");
    }
}

impl LockWaitObserver for WaitFeedback {
    fn on_wait_start(&self, key: &str) {
        *self.last_emit.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        self.emit_line(&format!(
            "Waiting for lock '{key}' held by another owner; Ctrl-C to cancel."
        ));
    }

    fn on_retry(&self, key: &str, _attempt: usize, elapsed: Duration) {
        let now = Instant::now();
        {
            let mut last_emit = self.last_emit.lock().unwrap_or_else(|e| e.into_inner());
            let due = last_emit
                .map(|last| now.duration_since(last) >= self.interval)
                .unwrap_or(true);
            if !due {
                return;
            }
            *last_emit = Some(now);
        }

        let waited = format_duration(elapsed);
        self.emit_line(&format!("Still waiting for lock '{key}' (elapsed {waited})"));
    }

    fn on_acquired(&self, key: &str, attempts: usize, waited: Duration) {
        if attempts > 1 {
            let waited = format_duration(waited);
            self.emit_line(&format!("Acquired lock '{key}' after {waited}"));
        }
    }

    fn on_exhausted(&self, key: &str, attempts: usize, waited: Duration) {
        if attempts > 1 {
            let waited = format_duration(waited);
            self.emit_line(&format!(
                "Gave up on lock '{key}' after {attempts} attempt(s) in {waited}"
            ));
        }
    }

    fn on_cancelled(&self, key: &str, waited: Duration) {
        let waited = format_duration(waited);
        self.emit_line(&format!("Cancelled wait for lock '{key}' after {waited}"));
    }
}

pub(crate) fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.1}s", duration.as_secs_f32())
    } else {
        format!("{:.0}ms", duration.as_millis())
    }
}
