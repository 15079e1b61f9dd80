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

use crate::error::LockError;
use std::fmt;

pub struct ErrorContext<'a> {
    pub error: &'a LockError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(error: &'a LockError) -> Self {
        let (suggestion, details) = match error {
            LockError::StoreUnavailable {
                operation,
                key,
                details,
            } => {
                let suggestion = Some(
                    "Check that the store directory exists and is writable, or pass \
                     --store-dir to point at the shared store."
                        .to_string(),
                );
                let details = Some(format!(
                    "The store could not evaluate '{operation}' for key '{key}': {details}. \
                     The lock state is unknown."
                ));
                (suggestion, details)
            }
            LockError::WaitInterrupted { key, .. } => {
                let suggestion = Some(format!(
                    "Nothing was acquired. Run 'kvlock status {key}' to see the current holder."
                ));
                (suggestion, None)
            }
            LockError::ConfigFile(msg) => {
                let suggestion = Some(
                    "Fix the syntax of config.toml or remove it to fall back to defaults."
                        .to_string(),
                );
                let details = Some(msg.clone());
                (suggestion, details)
            }
            LockError::InvalidConfig(msg) => {
                let suggestion = Some(
                    "Review the [locking] and [store] sections of config.toml.".to_string(),
                );
                let details = Some(msg.clone());
                (suggestion, details)
            }
            LockError::Io(err) => {
                let details = Some(format!("I/O failure: {err}"));
                (None, details)
            }
            LockError::Json(err) => {
                let details = Some(format!("Malformed lock record: {err}"));
                (None, details)
            }
        };

        Self {
            error,
            suggestion,
            details,
        }
    }
}

impl<'a> fmt::Display for ErrorContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\n\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}
