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

use crate::commands::feedback::format_duration;
use crate::commands::open_store;
use crate::config::KvlockConfig;
use crate::error::Result;
use crate::store::{AtomicStore, LockKind, LockRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize, PartialEq)]
struct StatusOutput {
    key: String,
    held: bool,
    kind: Option<LockKind>,
    held_by: Option<String>,
    count: u64,
    expires_at: Option<DateTime<Utc>>,
    remaining_ms: u64,
}

impl StatusOutput {
    fn new(key: &str, record: Option<&LockRecord>, now: DateTime<Utc>) -> Self {
        match record {
            Some(record) => Self {
                key: key.to_string(),
                held: true,
                kind: Some(record.kind),
                held_by: Some(record.held_by.clone()),
                count: record.count,
                expires_at: Some(record.expires_at),
                remaining_ms: record.remaining(now).as_millis() as u64,
            },
            None => Self {
                key: key.to_string(),
                held: false,
                kind: None,
                held_by: None,
                count: 0,
                expires_at: None,
                remaining_ms: 0,
            },
        }
    }
}

pub struct StatusCommand {
    store: Arc<dyn AtomicStore>,
}

impl StatusCommand {
    pub fn new(config: &KvlockConfig) -> Result<Self> {
        Ok(Self::with_store(open_store(config)?))
    }

    pub fn with_store(store: Arc<dyn AtomicStore>) -> Self {
        Self { store }
    }

    pub fn execute(&self, key: &str, json: bool) -> Result<()> {
        let record = self.store.inspect(key)?;
        let output = StatusOutput::new(key, record.as_ref(), Utc::now());

        if json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", render(&output));
        }
        Ok(())
    }
}

fn render(output: &StatusOutput) -> String {
    let (Some(kind), Some(held_by)) = (output.kind, output.held_by.as_deref()) else {
        return format!("Lock '{}' is free", output.key);
    };
    let remaining = format_duration(std::time::Duration::from_millis(output.remaining_ms));
    format!(
        "Lock '{}' is held by '{held_by}' ({kind}, count {}), expires in {remaining}",
        output.key, output.count
    )
}
