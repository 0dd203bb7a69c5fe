//! Artifact file lifecycle.
//!
//! Downloads land in a private `.part` temp file in the same directory as the
//! artifact so the final rename stays on one filesystem and is atomic. The
//! canonical path only ever holds a complete artifact or its previous version.

mod part;

pub use part::PartFile;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{GatedlError, Result};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Permission bits applied to finalized artifacts.
#[cfg(unix)]
pub const ARTIFACT_MODE: u32 = 0o644;

/// Size of the file at `path`, or `None` if it does not exist.
pub fn existing_size(path: &Path) -> Result<Option<u64>> {
    match fs::metadata(path) {
        Ok(m) => Ok(Some(m.len())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(GatedlError::storage(
            format!("stat {}", path.display()),
            e,
        )),
    }
}

/// Create `dir` and its parents if absent.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| GatedlError::Directory {
        path: dir.to_path_buf(),
        source,
    })
}

/// Delete `path` if it exists and is zero bytes. Returns true if it was removed.
pub fn remove_if_empty(path: &Path) -> Result<bool> {
    if existing_size(path)? != Some(0) {
        return Ok(false);
    }
    fs::remove_file(path)
        .map_err(|e| GatedlError::storage(format!("remove empty {}", path.display()), e))?;
    tracing::debug!(path = %path.display(), "removed zero-byte cached artifact");
    Ok(true)
}
