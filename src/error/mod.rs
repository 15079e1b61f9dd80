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

mod context;
mod exit_codes;
mod format;

pub use context::ErrorContext;
pub use exit_codes::{EXIT_LOCK_BUSY, get_exit_code};
pub use format::format_error_chain;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockError {
    /// The store could not evaluate an atomic operation. Never means "not acquired".
    #[error("Lock store unavailable during {operation} on '{key}': {details}")]
    StoreUnavailable {
        operation: &'static str,
        key: String,
        details: String,
    },

    /// The wait between two acquisition attempts was cancelled.
    #[error("Waiting for lock '{key}' was interrupted after {waited_secs:.3}s")]
    WaitInterrupted { key: String, waited_secs: f64 },

    #[error("Configuration file error: {0}")]
    ConfigFile(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LockError {
    pub(crate) fn store_unavailable(
        operation: &'static str,
        key: &str,
        details: impl ToString,
    ) -> Self {
        LockError::StoreUnavailable {
            operation,
            key: key.to_string(),
            details: details.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LockError>;
