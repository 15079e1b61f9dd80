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

use crate::error::{LockError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.toml";
const STORE_DIR_NAME: &str = "store";
/// Environment variable overriding the kvlock home directory.
pub const HOME_ENV_VAR: &str = "KVLOCK_HOME";

const DEFAULT_EXCLUSIVE_TTL_SECS: u64 = 1;
const DEFAULT_REENTRANT_TTL_SECS: u64 = 3;
const DEFAULT_BLOCKING_TTL_SECS: u64 = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_RETRY_TIMES: u32 = 3;
const DEFAULT_RETRY_SLEEP_MS: u64 = 100;
const MIN_POLL_INTERVAL_MS: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KvlockConfig {
    #[serde(skip)]
    home: PathBuf,

    #[serde(default)]
    pub locking: LockingConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Timing defaults applied to every lock built from this configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockingConfig {
    #[serde(default = "default_exclusive_ttl_secs")]
    pub exclusive_ttl_secs: u64,
    #[serde(default = "default_reentrant_ttl_secs")]
    pub reentrant_ttl_secs: u64,
    /// TTL used by every attempt of a blocking acquisition.
    #[serde(default = "default_blocking_ttl_secs")]
    pub blocking_ttl_secs: u64,
    /// Sleep between attempts of a blocking acquisition.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,
    #[serde(default = "default_retry_sleep_ms")]
    pub retry_sleep_ms: u64,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            exclusive_ttl_secs: DEFAULT_EXCLUSIVE_TTL_SECS,
            reentrant_ttl_secs: DEFAULT_REENTRANT_TTL_SECS,
            blocking_ttl_secs: DEFAULT_BLOCKING_TTL_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            retry_times: DEFAULT_RETRY_TIMES,
            retry_sleep_ms: DEFAULT_RETRY_SLEEP_MS,
        }
    }
}

impl LockingConfig {
    /// Sleep between blocking attempts, never shorter than 1ms so an
    /// unvalidated zero cannot turn the wait into a busy loop.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn retry_sleep(&self) -> Duration {
        Duration::from_millis(self.retry_sleep_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(LockError::InvalidConfig(
                "locking.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_exclusive_ttl_secs() -> u64 {
    DEFAULT_EXCLUSIVE_TTL_SECS
}

fn default_reentrant_ttl_secs() -> u64 {
    DEFAULT_REENTRANT_TTL_SECS
}

fn default_blocking_ttl_secs() -> u64 {
    DEFAULT_BLOCKING_TTL_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_retry_times() -> u32 {
    DEFAULT_RETRY_TIMES
}

fn default_retry_sleep_ms() -> u64 {
    DEFAULT_RETRY_SLEEP_MS
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Shared store directory. Defaults to `<home>/store`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl KvlockConfig {
    pub fn new(home: PathBuf) -> Self {
        Self {
            home,
            ..Self::default()
        }
    }

    pub fn load(home: &Path) -> Result<Self> {
        let config_path = home.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            log::debug!("Config file not found at {config_path:?}, using defaults");
            return Ok(Self::new(home.to_path_buf()));
        }

        let contents = fs::read_to_string(&config_path)
            .map_err(|e| LockError::ConfigFile(format!("Failed to read config.toml: {e}")))?;
        let mut config: KvlockConfig = toml::from_str(&contents)
            .map_err(|e| LockError::ConfigFile(format!("Failed to parse config.toml: {e}")))?;
        config.locking.validate()?;
        config.home = home.to_path_buf();

        log::debug!("Loaded config from {config_path:?}");
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = self.home.join(CONFIG_FILE_NAME);

        fs::create_dir_all(&self.home)?;

        let contents = toml::to_string_pretty(self)
            .map_err(|e| LockError::ConfigFile(format!("Failed to serialize config: {e}")))?;

        fs::write(&config_path, contents)?;
        log::debug!("Saved config to {config_path:?}");
        Ok(())
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn store_dir(&self) -> PathBuf {
        self.store
            .dir
            .clone()
            .unwrap_or_else(|| self.home.join(STORE_DIR_NAME))
    }
}

/// Resolves the home directory: `KVLOCK_HOME` first, then `~/.kvlock`.
pub fn resolve_home() -> Result<PathBuf> {
    if let Ok(home) = env::var(HOME_ENV_VAR)
        && !home.trim().is_empty()
    {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir()
        .map(|home| home.join(".kvlock"))
        .ok_or_else(|| {
            LockError::InvalidConfig(format!(
                "Unable to determine a home directory; set {HOME_ENV_VAR}"
            ))
        })
}

/// Loads the configuration from the resolved home directory.
pub fn new_kvlock_config() -> Result<KvlockConfig> {
    let home = resolve_home()?;
    KvlockConfig::load(&home)
}
