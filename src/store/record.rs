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

//! Lock records and the check-then-mutate rules every store applies.
//!
//! Stores own atomicity: they load the live record for a key, call one of the
//! transition functions below while holding their own critical section, and
//! persist whatever [`Transition`] comes back. Keeping the rules here means the
//! in-memory and file-backed stores cannot drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which lock flavour created a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    Exclusive,
    Reentrant,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Exclusive => f.write_str("exclusive"),
            LockKind::Reentrant => f.write_str("reentrant"),
        }
    }
}

/// State of one key as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub key: String,
    pub kind: LockKind,
    pub held_by: String,
    pub count: u64,
    pub expires_at: DateTime<Utc>,
}

impl LockRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Time left before the record self-expires, or zero when already expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.expires_at - now).to_std().unwrap_or_default()
    }

    fn is_held(&self, kind: LockKind, holder: &str) -> bool {
        self.kind == kind && self.held_by == holder
    }
}

/// What a store must do with the record after evaluating an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Write(LockRecord),
    Delete,
}

fn expiry(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    // A zero TTL would create a record that is dead on arrival.
    let secs = i64::try_from(ttl_secs.max(1)).unwrap_or(i64::MAX);
    now.checked_add_signed(chrono::Duration::seconds(secs))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Evaluates an exclusive acquire against the live record for `key`.
pub fn acquire_exclusive(
    live: Option<&LockRecord>,
    key: &str,
    token: &str,
    ttl_secs: u64,
    now: DateTime<Utc>,
) -> (bool, Transition) {
    match live {
        None => (
            true,
            Transition::Write(LockRecord {
                key: key.to_string(),
                kind: LockKind::Exclusive,
                held_by: token.to_string(),
                count: 1,
                expires_at: expiry(now, ttl_secs),
            }),
        ),
        Some(record) if record.is_held(LockKind::Exclusive, token) => {
            let mut renewed = record.clone();
            renewed.expires_at = expiry(now, ttl_secs);
            (true, Transition::Write(renewed))
        }
        Some(_) => (false, Transition::Unchanged),
    }
}

/// Evaluates an exclusive release. An empty token deletes whatever is there.
pub fn release_exclusive(live: Option<&LockRecord>, token: &str) -> Transition {
    match live {
        Some(_) if token.is_empty() => Transition::Delete,
        Some(record) if record.is_held(LockKind::Exclusive, token) => Transition::Delete,
        _ => Transition::Unchanged,
    }
}

/// Evaluates a reentrant acquire. `max_count == -1` means unbounded.
pub fn acquire_reentrant(
    live: Option<&LockRecord>,
    key: &str,
    owner_id: &str,
    max_count: i64,
    ttl_secs: u64,
    now: DateTime<Utc>,
) -> (bool, Transition) {
    match live {
        None => (
            true,
            Transition::Write(LockRecord {
                key: key.to_string(),
                kind: LockKind::Reentrant,
                held_by: owner_id.to_string(),
                count: 1,
                expires_at: expiry(now, ttl_secs),
            }),
        ),
        Some(record) if record.is_held(LockKind::Reentrant, owner_id) => {
            let count = i64::try_from(record.count).unwrap_or(i64::MAX);
            if max_count >= 0 && count >= max_count {
                return (false, Transition::Unchanged);
            }
            let mut entered = record.clone();
            entered.count = entered.count.saturating_add(1);
            entered.expires_at = expiry(now, ttl_secs);
            (true, Transition::Write(entered))
        }
        Some(_) => (false, Transition::Unchanged),
    }
}

/// Evaluates a reentrant release. The expiry of a partially released record is left as is.
pub fn release_reentrant(live: Option<&LockRecord>, owner_id: &str) -> Transition {
    match live {
        Some(record) if record.is_held(LockKind::Reentrant, owner_id) => {
            if record.count <= 1 {
                Transition::Delete
            } else {
                let mut exited = record.clone();
                exited.count -= 1;
                Transition::Write(exited)
            }
        }
        _ => Transition::Unchanged,
    }
}
