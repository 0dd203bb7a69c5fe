//! JSON sidecar backend: `.<artifact>.gatedl.json` next to the artifact.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::AttributeStore;
use crate::error::{GatedlError, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarStore;

impl SidecarStore {
    /// Sidecar path for `artifact` (e.g. `downloads/.foo.pkg.gatedl.json`).
    pub fn sidecar_path(artifact: &Path) -> PathBuf {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        artifact.with_file_name(format!(".{}.gatedl.json", name))
    }

    fn read(artifact: &Path) -> Result<BTreeMap<String, String>> {
        let path = Self::sidecar_path(artifact);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => return Err(GatedlError::Metadata { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|e| GatedlError::Metadata {
            path,
            source: e.into(),
        })
    }

    fn write(artifact: &Path, attrs: &BTreeMap<String, String>) -> Result<()> {
        let path = Self::sidecar_path(artifact);
        if attrs.is_empty() {
            return remove_quiet(&path);
        }
        let json = serde_json::to_vec_pretty(attrs).map_err(|e| GatedlError::Metadata {
            path: path.clone(),
            source: e.into(),
        })?;
        fs::write(&path, json).map_err(|source| GatedlError::Metadata { path, source })
    }
}

fn remove_quiet(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(GatedlError::Metadata {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl AttributeStore for SidecarStore {
    fn get(&self, path: &Path, key: &str) -> Result<Option<String>> {
        Ok(Self::read(path)?.remove(key))
    }

    fn set(&self, path: &Path, key: &str, value: &str) -> Result<()> {
        let mut attrs = Self::read(path)?;
        attrs.insert(key.to_string(), value.to_string());
        Self::write(path, &attrs)
    }

    fn remove(&self, path: &Path, key: &str) -> Result<()> {
        let mut attrs = Self::read(path)?;
        if attrs.remove(key).is_some() {
            Self::write(path, &attrs)?;
        }
        Ok(())
    }

    fn forget(&self, path: &Path) -> Result<()> {
        remove_quiet(&Self::sidecar_path(path))
    }
}
