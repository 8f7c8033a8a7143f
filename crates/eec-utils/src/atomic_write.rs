//! Atomic file writes: temp file in the target directory, fsync, rename.
//!
//! Readers of a path written this way observe either the previous content or
//! the new content, never a torn write. This is what makes per-field record
//! files safe to read while a worker updates them.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically replace `path` with `content`, creating parent directories.
pub fn write_file_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = parent_of(path)?;
    crate::paths::ensure_dir_all(parent)?;
    replace_file_atomic(path, content)
}

/// Atomically replace `path` with `content` in a directory that must already
/// exist. A missing directory fails with [`io::ErrorKind::NotFound`].
pub fn replace_file_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = parent_of(path)?;
    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(content)?;
    temp_file.as_file().sync_all()?;

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn parent_of(path: &Path) -> io::Result<&Path> {
    path.parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No parent directory"))
}

/// Atomically write a UTF-8 string, normalizing line endings to LF.
pub fn write_text_atomic(path: &Path, content: &str) -> io::Result<()> {
    let normalized = normalize_line_endings(content);
    write_file_atomic(path, normalized.as_bytes())
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}
