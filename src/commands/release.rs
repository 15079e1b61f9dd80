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

use crate::commands::open_store;
use crate::config::KvlockConfig;
use crate::error::Result;
use crate::locking::{force_release, force_release_with_token};
use crate::store::AtomicStore;
use std::sync::Arc;

pub struct ReleaseCommand {
    store: Arc<dyn AtomicStore>,
}

impl ReleaseCommand {
    pub fn new(config: &KvlockConfig) -> Result<Self> {
        Ok(Self::with_store(open_store(config)?))
    }

    pub fn with_store(store: Arc<dyn AtomicStore>) -> Self {
        Self { store }
    }

    /// Releases `key` if `token` holds it; otherwise leaves it untouched.
    pub fn execute(&self, key: &str, token: &str) -> Result<()> {
        force_release_with_token(self.store.as_ref(), key, token)
    }

    /// Releases `key` regardless of holder, or only for `token` when one is given.
    pub fn execute_force(&self, key: &str, token: Option<&str>) -> Result<()> {
        match token {
            Some(token) => force_release_with_token(self.store.as_ref(), key, token),
            None => {
                log::info!("Force releasing lock '{key}'");
                force_release(self.store.as_ref(), key)
            }
        }
    }
}
