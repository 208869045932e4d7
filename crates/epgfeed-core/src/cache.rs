//! Response cache over raw upstream payloads.
//!
//! One JSON file per key under the cache directory, each carrying its own
//! write timestamp. Expiry is lazy: entries past the TTL behave as absent
//! on read and are removed opportunistically. The cache is best-effort
//! throughout; a failed store never aborts a regeneration run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Cache key of the full channel-list response.
pub const CHANNELS_KEY: &str = "channels";

/// Cache key of one 3-hour schedule window for one station on one day.
#[must_use]
pub fn window_key(date: NaiveDate, hour_offset: u8, station_id: &str) -> String {
    format!("date.{}.{hour_offset}.{station_id}", date.format("%Y%m%d"))
}

/// On-disk entry envelope.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    /// Write time; expiry is measured from here.
    stored_at: DateTime<Utc>,
    /// Raw upstream payload.
    payload: String,
}

/// Entry freshness predicate: an entry expires strictly after `ttl` has
/// elapsed since it was stored, so an entry exactly at the TTL is still
/// served.
fn is_fresh(stored_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now.signed_duration_since(stored_at) <= ttl
}

/// Filesystem-backed response cache with per-entry TTL.
#[derive(Debug)]
pub struct ResponseCache {
    /// Entry directory.
    dir: PathBuf,
    /// Time-to-live measured from write.
    ttl: Duration,
}

impl ResponseCache {
    /// Default entry TTL (48 hours).
    #[must_use]
    pub const fn default_ttl() -> Duration {
        Duration::hours(48)
    }

    /// Opens (and creates if needed) a cache directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>, ttl: Duration) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, ttl })
    }

    /// Returns whether a fresh entry exists for `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Reads a fresh entry's payload; expired or unreadable entries behave
    /// as absent. Expired entries are removed best-effort.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let path = self.entry_path(key);
        let raw = fs::read_to_string(&path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unreadable cache entry");
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        if is_fresh(entry.stored_at, Utc::now(), self.ttl) {
            tracing::debug!(key, "cache hit");
            Some(entry.payload)
        } else {
            tracing::debug!(key, "cache entry expired");
            let _ = fs::remove_file(&path);
            None
        }
    }

    /// Stores a payload under `key`, overwriting any previous entry.
    ///
    /// Best-effort: a store failure is logged and swallowed, leaving the
    /// cache in its previous state (the caller proceeds as on a miss).
    pub fn set(&self, key: &str, payload: &str) {
        if let Err(e) = self.store(key, payload, Utc::now()) {
            tracing::warn!(key, error = %e, "failed to store cache entry");
        }
    }

    /// Writes an entry atomically (temp file + rename) so concurrent readers
    /// see either the previous entry or the full new one, never a partial.
    fn store(&self, key: &str, payload: &str, stored_at: DateTime<Utc>) -> io::Result<()> {
        let entry = CacheEntry {
            stored_at,
            payload: String::from(payload),
        };
        let encoded = serde_json::to_string(&entry).map_err(io::Error::other)?;

        let path = self.entry_path(key);
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &path)
    }

    /// Entry file path for a key. Keys in this system are dot-separated
    /// alphanumerics, so no escaping is needed.
    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Cache directory path.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
