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

#![allow(dead_code)]

use assert_cmd::Command;
use kvlock::store::FileStore;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated kvlock home with its own store directory, removed on drop.
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create test home directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_dir(&self) -> PathBuf {
        self.path().join("store")
    }

    pub fn open_store(&self) -> FileStore {
        FileStore::open(self.store_dir()).expect("Failed to open test store")
    }

    pub fn write_config(&self, contents: &str) {
        std::fs::write(self.path().join("config.toml"), contents)
            .expect("Failed to write config.toml");
    }

    /// `kvlock` binary pointed at this home.
    pub fn kvlock(&self) -> Command {
        let mut command = Command::cargo_bin("kvlock").expect("kvlock binary");
        command.env("KVLOCK_HOME", self.path()).env_remove("RUST_LOG");
        command
    }
}
