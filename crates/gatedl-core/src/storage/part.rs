//! Private temp file adjacent to the artifact.

use std::fs;
use std::path::Path;
use tempfile::TempPath;

use super::TEMP_SUFFIX;
use crate::error::{GatedlError, Result};

/// A partial download. Removed on drop unless finalized into place.
#[derive(Debug)]
pub struct PartFile {
    path: TempPath,
}

impl PartFile {
    /// Create an empty private temp file next to `final_path`
    /// (e.g. `downloads/.Max.dmg.a1B2c3.part`).
    pub fn create_adjacent(final_path: &Path) -> Result<PartFile> {
        let dir = final_path.parent().unwrap_or_else(|| Path::new("."));
        let name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = tempfile::Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| {
                GatedlError::storage(format!("create temp file in {}", dir.display()), e)
            })?;
        Ok(PartFile {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> Result<u64> {
        fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| GatedlError::storage(format!("stat {}", self.path.display()), e))
    }

    /// Delete the temp file now.
    pub fn discard(self) -> Result<()> {
        let shown = self.path.display().to_string();
        self.path
            .close()
            .map_err(|e| GatedlError::storage(format!("remove {}", shown), e))
    }

    /// Atomically rename into `final_path` (replacing any previous artifact) and
    /// apply world-readable permissions.
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        let temp_shown = self.path.display().to_string();
        self.path.persist(final_path).map_err(|e| {
            GatedlError::storage(
                format!("can't move {} to {}", temp_shown, final_path.display()),
                e.error,
            )
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(final_path, fs::Permissions::from_mode(super::ARTIFACT_MODE))
                .map_err(|e| {
                    GatedlError::storage(format!("chmod {}", final_path.display()), e)
                })?;
        }
        Ok(())
    }
}
