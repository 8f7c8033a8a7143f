//! Home directory resolution for eec state.
//!
//! Resolution order:
//! 1) thread-local override (tests only)
//! 2) env `EEC_HOME`
//! 3) `.eec` relative to the working directory

use camino::Utf8PathBuf;
use std::cell::RefCell;

thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

pub const HOME_ENV_VAR: &str = "EEC_HOME";

/// Returns the eec home directory.
#[must_use]
pub fn eec_home() -> Utf8PathBuf {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return tl;
    }
    if let Ok(p) = std::env::var(HOME_ENV_VAR) {
        return Utf8PathBuf::from(p);
    }
    Utf8PathBuf::from(".eec")
}

/// Returns `<EEC_HOME>/records`
#[must_use]
pub fn records_dir() -> Utf8PathBuf {
    eec_home().join("records")
}

/// Returns `<EEC_HOME>/infrastructure`
#[must_use]
pub fn infrastructure_dir() -> Utf8PathBuf {
    eec_home().join("infrastructure")
}

/// Returns `<EEC_HOME>/config.toml`
#[must_use]
pub fn home_config_file() -> Utf8PathBuf {
    eec_home().join("config.toml")
}

/// Create a directory and its parents, ignoring benign races.
pub fn ensure_dir_all<P: AsRef<std::path::Path>>(p: P) -> std::io::Result<()> {
    match std::fs::create_dir_all(p.as_ref()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Guard for an isolated home used in tests. Clears the override on drop.
#[cfg(any(test, feature = "test-utils"))]
pub struct HomeGuard {
    dir: tempfile::TempDir,
}

#[cfg(any(test, feature = "test-utils"))]
impl HomeGuard {
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    #[must_use]
    pub fn utf8_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().to_path_buf())
            .unwrap_or_else(|p| Utf8PathBuf::from(p.to_string_lossy().into_owned()))
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Drop for HomeGuard {
    fn drop(&mut self) {
        THREAD_HOME.with(|tl| *tl.borrow_mut() = None);
    }
}

/// Point this thread's eec home at a fresh temporary directory.
///
/// Avoids process-global env mutation, so tests can run in parallel.
#[cfg(any(test, feature = "test-utils"))]
#[must_use]
pub fn with_isolated_home() -> HomeGuard {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let guard = HomeGuard { dir };
    let home = guard.utf8_path();
    THREAD_HOME.with(|tl| *tl.borrow_mut() = Some(home));
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_home_overrides_and_resets() {
        let home_path;
        {
            let guard = with_isolated_home();
            home_path = guard.utf8_path();
            assert_eq!(eec_home(), home_path);
            assert_eq!(records_dir(), home_path.join("records"));
            assert_eq!(infrastructure_dir(), home_path.join("infrastructure"));
        }
        assert_ne!(eec_home(), home_path);
    }

    #[test]
    fn test_ensure_dir_all_is_idempotent() {
        let guard = with_isolated_home();
        let nested = guard.path().join("a").join("b");
        ensure_dir_all(&nested).unwrap();
        ensure_dir_all(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
