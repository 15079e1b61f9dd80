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

use std::fmt;
use std::time::Duration;

/// Inclusive range, in whole seconds, that a lock flavour accepts as record TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlBounds {
    min_secs: u64,
    max_secs: u64,
}

/// Exclusive locks accept TTLs between 1 and 10 seconds.
pub const EXCLUSIVE_TTL_BOUNDS: TtlBounds = TtlBounds::new(1, 10);

/// Reentrant locks never go below 3 seconds so nested sections do not outlive the record.
pub const REENTRANT_TTL_BOUNDS: TtlBounds = TtlBounds::new(3, 10);

impl TtlBounds {
    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    pub fn min_secs(&self) -> u64 {
        self.min_secs
    }

    pub fn max_secs(&self) -> u64 {
        self.max_secs
    }

    pub fn clamp(&self, ttl_secs: u64) -> u64 {
        ttl_secs.clamp(self.min_secs, self.max_secs)
    }

    /// Truncates `duration` to whole seconds, then clamps.
    pub fn clamp_duration(&self, duration: Duration) -> u64 {
        self.clamp(duration.as_secs())
    }
}

impl fmt::Display for TtlBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}s, {}s]", self.min_secs, self.max_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_bounds_clamp_both_ends() {
        assert_eq!(EXCLUSIVE_TTL_BOUNDS.clamp(0), 1);
        assert_eq!(EXCLUSIVE_TTL_BOUNDS.clamp(5), 5);
        assert_eq!(EXCLUSIVE_TTL_BOUNDS.clamp(20), 10);
    }

    #[test]
    fn reentrant_bounds_start_at_three() {
        assert_eq!(REENTRANT_TTL_BOUNDS.clamp(1), 3);
        assert_eq!(REENTRANT_TTL_BOUNDS.clamp(10), 10);
        assert_eq!(REENTRANT_TTL_BOUNDS.clamp(u64::MAX), 10);
    }

    #[test]
    fn durations_are_truncated_to_seconds() {
        assert_eq!(
            EXCLUSIVE_TTL_BOUNDS.clamp_duration(Duration::from_millis(999)),
            1
        );
        assert_eq!(
            EXCLUSIVE_TTL_BOUNDS.clamp_duration(Duration::from_millis(2_700)),
            2
        );
        assert_eq!(
            REENTRANT_TTL_BOUNDS.clamp_duration(Duration::from_secs(20)),
            10
        );
    }

    #[test]
    fn bounds_display() {
        assert_eq!(EXCLUSIVE_TTL_BOUNDS.to_string(), "[1s, 10s]");
    }
}
