//! Exclusive serve lock for a record store root.
//!
//! Only one supervisor process may reconcile and drive the records of a
//! store. The lock is a file created with `create_new` semantics holding the
//! owner's [`LockInfo`]; it is removed when the [`ServeLock`] is dropped.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eec_utils::error::{EecError, StoreError};

/// File name of the lock inside the store root
pub const LOCK_FILE_NAME: &str = ".serve.lock";

/// Lock information stored in the lock file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process ID that created the lock
    pub pid: u32,
    /// When the lock was taken
    pub created_at: DateTime<Utc>,
    /// eec version that created the lock
    pub version: String,
}

/// Held serve lock. Released on drop.
#[derive(Debug)]
pub struct ServeLock {
    path: PathBuf,
    info: LockInfo,
}

impl ServeLock {
    /// Take the serve lock for `root`.
    ///
    /// With `force`, an existing lock is treated as stale and replaced. This is
    /// for recovering after a crashed supervisor; forcing a lock held by a live
    /// process lets two supervisors drive the same records.
    pub fn acquire(root: &Path, force: bool) -> Result<Self, EecError> {
        eec_utils::paths::ensure_dir_all(root).map_err(StoreError::from)?;
        let path = root.join(LOCK_FILE_NAME);

        match Self::create(&path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let holder_pid = Self::holder(root)?.map_or(0, |info| info.pid);
                if !force {
                    return Err(EecError::ServeLockHeld {
                        pid: holder_pid,
                        path: root.display().to_string(),
                    });
                }
                tracing::warn!(
                    path = %path.display(),
                    previous_pid = holder_pid,
                    "Overriding existing serve lock"
                );
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(StoreError::from(e).into()),
                }
                Self::create(&path).map_err(|e| match e.kind() {
                    io::ErrorKind::AlreadyExists => EecError::ServeLockHeld {
                        pid: 0,
                        path: root.display().to_string(),
                    },
                    _ => StoreError::from(e).into(),
                })
            }
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    fn create(path: &Path) -> io::Result<Self> {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(path)?;

        let info = LockInfo {
            pid: process::id(),
            created_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let json = serde_json::to_vec_pretty(&info).map_err(io::Error::other)?;
        let written = file.write_all(&json).and_then(|()| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(path);
            return Err(e);
        }

        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }

    /// Read the current holder of the lock for `root`, if any.
    ///
    /// A lock file that cannot be parsed is reported as held by PID 0.
    pub fn holder(root: &Path) -> Result<Option<LockInfo>, StoreError> {
        let path = root.join(LOCK_FILE_NAME);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes).unwrap_or(LockInfo {
                pid: 0,
                created_at: DateTime::<Utc>::default(),
                version: String::new(),
            }))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[must_use]
    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ServeLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_is_rejected() {
        let temp = TempDir::new().unwrap();
        let lock = ServeLock::acquire(temp.path(), false).unwrap();
        assert_eq!(lock.info().pid, process::id());

        let err = ServeLock::acquire(temp.path(), false).unwrap_err();
        match err {
            EecError::ServeLockHeld { pid, .. } => assert_eq!(pid, process::id()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_drop_releases_lock() {
        let temp = TempDir::new().unwrap();
        {
            let lock = ServeLock::acquire(temp.path(), false).unwrap();
            assert!(lock.path().exists());
        }
        assert!(ServeLock::holder(temp.path()).unwrap().is_none());
        ServeLock::acquire(temp.path(), false).unwrap();
    }

    #[test]
    fn test_force_replaces_stale_lock() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(LOCK_FILE_NAME), "not json").unwrap();

        let err = ServeLock::acquire(temp.path(), false).unwrap_err();
        assert!(matches!(err, EecError::ServeLockHeld { pid: 0, .. }));

        let lock = ServeLock::acquire(temp.path(), true).unwrap();
        let holder = ServeLock::holder(temp.path()).unwrap().unwrap();
        assert_eq!(&holder, lock.info());
    }
}
