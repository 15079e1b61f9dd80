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

pub mod acquire;
pub mod feedback;
pub mod reentrant;
pub mod release;
pub mod status;
pub mod sweep;

use crate::config::KvlockConfig;
use crate::error::Result;
use crate::store::FileStore;
use std::sync::Arc;

/// Opens the file store configured for this invocation.
pub(crate) fn open_store(config: &KvlockConfig) -> Result<Arc<FileStore>> {
    let dir = config.store_dir();
    log::debug!("Using lock store at {dir:?}");
    Ok(Arc::new(FileStore::open(dir)?))
}
