//! Single-flight regeneration lease.
//!
//! At most one regeneration run may be in flight. The lease is a file
//! created with `create_new` (atomic create-if-absent) whose content is an
//! RFC3339 expiry timestamp; a lease past its expiry is abandoned state
//! from a crashed run and is removed by the stale sweep that callers run on
//! every external trigger. The guard removes the file on drop, so release
//! is unconditional on every run exit path, success or failure.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

/// Single-flight lease over a regeneration run.
#[derive(Debug)]
pub struct RegenLease {
    /// Lease file path.
    path: PathBuf,
    /// Lease lifetime; the failsafe removes leases older than this.
    ttl: Duration,
}

/// Held lease; dropping it releases the lease file.
#[derive(Debug)]
pub struct LeaseGuard {
    path: PathBuf,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lease");
        }
    }
}

impl RegenLease {
    /// Default lease lifetime (1 hour).
    #[must_use]
    pub const fn default_ttl() -> Duration {
        Duration::hours(1)
    }

    /// Creates a lease handle over the given marker path.
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    /// Returns whether a live (non-expired) lease currently exists.
    #[must_use]
    pub fn is_held(&self) -> bool {
        matches!(self.read_expiry(), Some(expiry) if Utc::now() <= expiry)
    }

    /// Failsafe: removes the lease if it is expired or unreadable,
    /// regardless of whether a run is believed to be in progress. Run on
    /// every external trigger; recovers from a crash that skipped the
    /// normal release.
    pub fn sweep_stale(&self) {
        let expired = match self.read_expiry() {
            None => return,
            Some(expiry) => Utc::now() > expiry,
        };
        if expired {
            tracing::warn!(path = %self.path.display(), "removing stale regeneration lease");
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove stale lease");
            }
        }
    }

    /// Attempts to acquire the lease.
    ///
    /// Returns `None` while another live lease exists. An expired lease is
    /// removed and acquisition retried once.
    ///
    /// # Errors
    ///
    /// Returns an error if the lease file cannot be created or written.
    pub fn try_acquire(&self) -> io::Result<Option<LeaseGuard>> {
        for _ in 0..2 {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
            {
                Ok(mut file) => {
                    let expiry = Utc::now() + self.ttl;
                    file.write_all(expiry.to_rfc3339().as_bytes())?;
                    tracing::debug!(path = %self.path.display(), %expiry, "lease acquired");
                    return Ok(Some(LeaseGuard {
                        path: self.path.clone(),
                    }));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if self.is_held() {
                        return Ok(None);
                    }
                    // Expired or unreadable; clear it and retry the create.
                    self.sweep_stale();
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Reads the stored expiry. `None` when no lease file exists; an
    /// unreadable or unparsable file reads as already expired.
    fn read_expiry(&self) -> Option<DateTime<Utc>> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(expiry) => Some(expiry.with_timezone(&Utc)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "unparsable lease file");
                Some(DateTime::<Utc>::MIN_UTC)
            }
        }
    }

    /// Lease file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn lease_in(dir: &tempfile::TempDir) -> RegenLease {
        RegenLease::new(dir.path().join("epg-is-being-generated"), Duration::hours(1))
    }

    #[test]
    fn test_acquire_creates_marker_and_drop_releases() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let lease = lease_in(&dir);

        // Act
        let guard = lease.try_acquire().unwrap();

        // Assert
        assert!(guard.is_some());
        assert!(lease.path().exists());
        assert!(lease.is_held());

        // Act: release
        drop(guard);

        // Assert
        assert!(!lease.path().exists());
        assert!(!lease.is_held());
    }

    #[test]
    fn test_second_acquire_while_held_returns_none() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let lease = lease_in(&dir);
        let _guard = lease.try_acquire().unwrap().unwrap();

        // Act & Assert
        assert!(lease.try_acquire().unwrap().is_none());
    }

    #[test]
    fn test_expired_lease_is_swept() {
        // Arrange: a lease whose expiry is in the past
        let dir = tempfile::tempdir().unwrap();
        let lease = lease_in(&dir);
        let expired = (Utc::now() - Duration::minutes(1)).to_rfc3339();
        fs::write(lease.path(), expired).unwrap();

        // Act
        lease.sweep_stale();

        // Assert
        assert!(!lease.path().exists());
    }

    #[test]
    fn test_live_lease_survives_sweep() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let lease = lease_in(&dir);
        let _guard = lease.try_acquire().unwrap().unwrap();

        // Act
        lease.sweep_stale();

        // Assert
        assert!(lease.path().exists());
    }

    #[test]
    fn test_acquire_over_expired_lease_succeeds() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let lease = lease_in(&dir);
        let expired = (Utc::now() - Duration::minutes(1)).to_rfc3339();
        fs::write(lease.path(), expired).unwrap();

        // Act
        let guard = lease.try_acquire().unwrap();

        // Assert
        assert!(guard.is_some());
    }

    #[test]
    fn test_unparsable_lease_treated_as_stale() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let lease = lease_in(&dir);
        fs::write(lease.path(), "1").unwrap();

        // Act & Assert
        assert!(!lease.is_held());
        assert!(lease.try_acquire().unwrap().is_some());
    }
}
