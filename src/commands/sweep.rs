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
use crate::config::KvlockConfig;
use crate::error::Result;
use crate::store::{FileStore, SweepReport};

pub struct SweepCommand {
    store: FileStore,
}

impl SweepCommand {
    pub fn new(config: &KvlockConfig) -> Result<Self> {
        Ok(Self {
            store: FileStore::open(config.store_dir())?,
        })
    }

    pub fn execute(&self) -> Result<SweepReport> {
        let report = self.store.sweep_expired()?;
        println!(
            "Removed {} expired lock(s), {} stale staging file(s) and {} unused guard(s) in {}",
            report.removed_records,
            report.removed_staging,
            report.removed_guards,
            format_duration(report.duration)
        );
        if report.errors > 0 {
            eprintln!(
                "{} entr{} could not be cleaned; rerun with -vv for details",
                report.errors,
                if report.errors == 1 { "y" } else { "ies" }
            );
        }
        Ok(report)
    }
}
