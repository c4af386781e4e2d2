//! Publishing generated files.
//!
//! Output is staged in a temporary file next to its destination and then
//! renamed over it, so a failed run never leaves a half-written file behind.

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Atomically replace `path` with `contents`, creating parent directories
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(dir).map_err(|e| Error::directory_create(dir, e))?;

    let mut staged = NamedTempFile::new_in(dir).map_err(|e| Error::file_write(path, e))?;
    staged
        .write_all(contents)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|e| Error::file_write(path, e))?;

    debug!("Publishing {} bytes to {}", contents.len(), path.display());
    staged
        .persist(path)
        .map_err(|e| Error::file_write(path, e.error))?;

    Ok(())
}
