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

//! Directory-backed store shared by every process that can reach the directory.
//!
//! Each key owns two files named after the SHA-256 of the key: `<hash>.json`
//! holds the serialized [`LockRecord`] and `<hash>.guard` is an advisory-lock
//! target. Every operation holds an exclusive advisory lock on the guard for
//! its whole check-then-mutate sequence, which makes the four store
//! operations atomic across processes. Records are written to a staging file
//! and renamed into place so readers never observe a torn record.
//!
//! Guard files outlive their records. [`FileStore::sweep_expired`] unlinks the
//! guard of every key without a record while holding that guard's lock; a
//! waiter that locked the unlinked file notices the path moved on and locks
//! again. On platforms without inode identity (non-unix) guards are never
//! removed, so the directory keeps one guard per key ever used.

use crate::error::{LockError, Result};
use crate::store::AtomicStore;
use crate::store::clock::{Clock, SystemClock};
use crate::store::record::{self, LockRecord, Transition};
use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use uuid::Uuid;

const RECORD_SUFFIX: &str = ".json";
const GUARD_SUFFIX: &str = ".guard";
/// Substring used for temporary staging artifacts while a record is written.
const STAGING_SEGMENT: &str = ".staging-";
/// Staging files older than this are leftovers of a crashed writer.
const STAGING_MAX_AGE: Duration = Duration::from_secs(60);

/// Summary of a [`FileStore::sweep_expired`] pass.
#[derive(Debug, Default, Clone)]
pub struct SweepReport {
    pub removed_records: usize,
    pub removed_staging: usize,
    pub removed_guards: usize,
    pub errors: usize,
    pub duration: Duration,
}

#[derive(Default)]
struct SweptKey {
    record_removed: bool,
    guard_removed: bool,
}

/// [`AtomicStore`] persisted as files in a shared directory.
pub struct FileStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileStore {
    pub fn open<P: Into<PathBuf>>(root: P) -> Result<Self> {
        Self::with_clock(root, Arc::new(SystemClock))
    }

    pub fn with_clock<P: Into<PathBuf>>(root: P, clock: Arc<dyn Clock>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| {
            LockError::store_unavailable(
                "open",
                "",
                format!("failed to create store directory {}: {err}", root.display()),
            )
        })?;
        debug!("Opened file store at {}", root.display());
        Ok(Self { root, clock })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Removes expired records, abandoned staging files and the guards of keys
    /// that no longer have a record.
    pub fn sweep_expired(&self) -> Result<SweepReport> {
        let start = Instant::now();
        let mut report = SweepReport::default();

        let entries = fs::read_dir(&self.root).map_err(|err| {
            LockError::store_unavailable("sweep", "", format!("{}: {err}", self.root.display()))
        })?;

        let mut hashes = BTreeSet::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    warn!("Failed to read entry in {}: {err}", self.root.display());
                    report.errors += 1;
                    continue;
                }
            };
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };

            if name.contains(STAGING_SEGMENT) {
                match remove_if_stale(&path, SystemTime::now()) {
                    Ok(true) => report.removed_staging += 1,
                    Ok(false) => {}
                    Err(err) => {
                        warn!("Failed to remove staging file {}: {err}", path.display());
                        report.errors += 1;
                    }
                }
                continue;
            }

            if let Some(hash) = name
                .strip_suffix(RECORD_SUFFIX)
                .or_else(|| name.strip_suffix(GUARD_SUFFIX))
            {
                hashes.insert(hash.to_string());
            }
        }

        for hash in &hashes {
            match self.sweep_key(hash) {
                Ok(outcome) => {
                    report.removed_records += usize::from(outcome.record_removed);
                    report.removed_guards += usize::from(outcome.guard_removed);
                }
                Err(err) => {
                    warn!("Failed to sweep entries for {hash}: {err}");
                    report.errors += 1;
                }
            }
        }

        report.duration = start.elapsed();
        debug!(
            "Swept {} expired record(s), {} staging file(s) and {} guard(s) from {} in {:.3}s",
            report.removed_records,
            report.removed_staging,
            report.removed_guards,
            self.root.display(),
            report.duration.as_secs_f64()
        );
        Ok(report)
    }

    fn sweep_key(&self, hash: &str) -> io::Result<SweptKey> {
        let guard = GuardFile::lock(&self.path_for(hash, GUARD_SUFFIX))?;
        let record_path = self.path_for(hash, RECORD_SUFFIX);
        let mut outcome = SweptKey::default();

        if let Some(record) = read_record(&record_path)? {
            if !record.is_expired(self.clock.now()) {
                return Ok(outcome);
            }
            trace!("Sweeping expired record for '{}'", record.key);
            remove_file_if_exists(&record_path)?;
            outcome.record_removed = true;
        }

        outcome.guard_removed = guard.remove()?;
        Ok(outcome)
    }

    fn path_for(&self, hash: &str, suffix: &str) -> PathBuf {
        self.root.join(format!("{hash}{suffix}"))
    }

    fn apply<T>(
        &self,
        operation: &'static str,
        key: &str,
        evaluate: impl FnOnce(Option<&LockRecord>, DateTime<Utc>) -> (T, Transition),
    ) -> Result<T> {
        let hash = key_hash(key);
        let unavailable = |err: io::Error| LockError::store_unavailable(operation, key, err);

        let _guard = GuardFile::lock(&self.path_for(&hash, GUARD_SUFFIX)).map_err(unavailable)?;
        let record_path = self.path_for(&hash, RECORD_SUFFIX);
        let now = self.clock.now();

        let stored = read_record(&record_path).map_err(unavailable)?;
        if let Some(existing) = &stored
            && existing.key != key
        {
            return Err(LockError::store_unavailable(
                operation,
                key,
                format!(
                    "record file {} belongs to key '{}'",
                    record_path.display(),
                    existing.key
                ),
            ));
        }

        let expired = stored.as_ref().is_some_and(|existing| existing.is_expired(now));
        let live = if expired { None } else { stored.as_ref() };
        let (outcome, transition) = evaluate(live, now);

        match transition {
            Transition::Write(updated) => {
                write_record(&record_path, &updated).map_err(unavailable)?;
            }
            Transition::Delete => {
                remove_file_if_exists(&record_path).map_err(unavailable)?;
            }
            Transition::Unchanged if expired => {
                trace!("Dropping expired record for '{key}'");
                remove_file_if_exists(&record_path).map_err(unavailable)?;
            }
            Transition::Unchanged => {}
        }
        Ok(outcome)
    }
}

impl AtomicStore for FileStore {
    fn acquire_exclusive(&self, key: &str, token: &str, ttl_secs: u64) -> Result<bool> {
        self.apply("acquire_exclusive", key, |live, now| {
            record::acquire_exclusive(live, key, token, ttl_secs, now)
        })
    }

    fn release_exclusive(&self, key: &str, token: &str) -> Result<()> {
        self.apply("release_exclusive", key, |live, _| {
            ((), record::release_exclusive(live, token))
        })
    }

    fn acquire_reentrant(
        &self,
        key: &str,
        owner_id: &str,
        max_count: i64,
        ttl_secs: u64,
    ) -> Result<bool> {
        self.apply("acquire_reentrant", key, |live, now| {
            record::acquire_reentrant(live, key, owner_id, max_count, ttl_secs, now)
        })
    }

    fn release_reentrant(&self, key: &str, owner_id: &str) -> Result<()> {
        self.apply("release_reentrant", key, |live, _| {
            ((), record::release_reentrant(live, owner_id))
        })
    }

    fn inspect(&self, key: &str) -> Result<Option<LockRecord>> {
        self.apply("inspect", key, |live, _| (live.cloned(), Transition::Unchanged))
    }
}

/// Exclusive advisory lock on a guard file, released on drop.
struct GuardFile {
    file: File,
    path: PathBuf,
}

impl GuardFile {
    /// Locks the file currently at `path`. A lock taken on a file that a sweep
    /// unlinked in the meantime is dropped and taken again on the new file.
    fn lock(path: &Path) -> io::Result<Self> {
        loop {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?;

            file.lock()?;
            let guard = Self {
                file,
                path: path.to_path_buf(),
            };
            if guard.is_current()? {
                return Ok(guard);
            }
            trace!("Guard {} was replaced while waiting; locking again", path.display());
        }
    }

    #[cfg(unix)]
    fn is_current(&self) -> io::Result<bool> {
        use std::os::unix::fs::MetadataExt;

        let locked = self.file.metadata()?;
        match fs::metadata(&self.path) {
            Ok(current) => Ok(current.dev() == locked.dev() && current.ino() == locked.ino()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    #[cfg(not(unix))]
    fn is_current(&self) -> io::Result<bool> {
        Ok(true)
    }

    /// Unlinks the guard while still holding its lock. Returns whether it was removed.
    #[cfg(unix)]
    fn remove(self) -> io::Result<bool> {
        remove_file_if_exists(&self.path)?;
        Ok(true)
    }

    #[cfg(not(unix))]
    fn remove(self) -> io::Result<bool> {
        Ok(false)
    }
}

impl Drop for GuardFile {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            warn!("Failed to unlock {}: {err}", self.path.display());
        }
    }
}

fn key_hash(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn read_record(path: &Path) -> io::Result<Option<LockRecord>> {
    let payload = match fs::read(path) {
        Ok(payload) => payload,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    let record = serde_json::from_slice(&payload).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed record {}: {err}", path.display()),
        )
    })?;
    Ok(Some(record))
}

fn write_record(path: &Path, record: &LockRecord) -> io::Result<()> {
    let staging = append_suffix(path, &format!("{STAGING_SEGMENT}{}", Uuid::new_v4()));
    let payload = serde_json::to_vec_pretty(record).map_err(io::Error::other)?;

    let result = (|| {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        fs::rename(&staging, path)
    })();

    if result.is_err() {
        let _ = remove_file_if_exists(&staging);
    }
    result
}

fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

fn remove_if_stale(path: &Path, now: SystemTime) -> io::Result<bool> {
    let modified = fs::metadata(path)?.modified()?;
    let age = now.duration_since(modified).unwrap_or_default();
    if age < STAGING_MAX_AGE {
        return Ok(false);
    }
    remove_file_if_exists(path)?;
    Ok(true)
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    file_name.push(suffix);
    path.with_file_name(file_name)
}
