//! Per-artifact freshness markers (ETag / Last-Modified).
//!
//! Markers live out of band, beside the artifact, behind the small
//! [`AttributeStore`] key/value interface so extended attributes and a JSON
//! sidecar file are interchangeable without touching the engine.

mod sidecar;
mod xattr;

pub use sidecar::SidecarStore;
pub use xattr::XattrStore;

use std::path::Path;

use crate::config::{GatedlConfig, MetadataBackend};
use crate::error::Result;

/// Key/value attributes attached to a file.
pub trait AttributeStore: Send + Sync {
    fn get(&self, path: &Path, key: &str) -> Result<Option<String>>;
    fn set(&self, path: &Path, key: &str, value: &str) -> Result<()>;
    /// Removing an absent key is not an error.
    fn remove(&self, path: &Path, key: &str) -> Result<()>;
    /// Drop any state kept outside the file itself (after the file is deleted).
    fn forget(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Freshness markers of a previously downloaded artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedArtifact {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub size_bytes: u64,
}

/// Namespaced ETag/Last-Modified access over an [`AttributeStore`].
pub struct MetadataStore {
    store: Box<dyn AttributeStore>,
    etag_key: String,
    last_modified_key: String,
}

impl MetadataStore {
    pub fn new(store: Box<dyn AttributeStore>, namespace: &str) -> Self {
        Self {
            store,
            etag_key: format!("{}.etag", namespace),
            last_modified_key: format!("{}.last-modified", namespace),
        }
    }

    pub fn from_config(cfg: &GatedlConfig) -> Self {
        let store: Box<dyn AttributeStore> = match cfg.metadata_backend {
            MetadataBackend::Xattr if XattrStore::supported() => Box::new(XattrStore),
            MetadataBackend::Xattr => {
                tracing::warn!("extended attributes unsupported on this platform; using sidecar files");
                Box::new(SidecarStore)
            }
            MetadataBackend::Sidecar => Box::new(SidecarStore),
        };
        Self::new(store, &cfg.attribute_namespace)
    }

    /// Markers for the artifact at `path`, which must exist.
    pub fn load(&self, path: &Path, size_bytes: u64) -> Result<CachedArtifact> {
        Ok(CachedArtifact {
            etag: self.store.get(path, &self.etag_key)?,
            last_modified: self.store.get(path, &self.last_modified_key)?,
            size_bytes,
        })
    }

    /// Store new markers; a `None` clears the corresponding stored value.
    pub fn save(&self, path: &Path, etag: Option<&str>, last_modified: Option<&str>) -> Result<()> {
        for (key, value) in [
            (&self.etag_key, etag),
            (&self.last_modified_key, last_modified),
        ] {
            match value {
                Some(v) => self.store.set(path, key, v)?,
                None => self.store.remove(path, key)?,
            }
        }
        Ok(())
    }

    /// Forget markers of an artifact that was deleted.
    pub fn forget(&self, path: &Path) -> Result<()> {
        self.store.forget(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sidecar_store() -> MetadataStore {
        MetadataStore::new(Box::new(SidecarStore), "user.gatedl")
    }

    #[test]
    fn load_without_markers() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("foo.pkg");
        std::fs::write(&p, b"x").unwrap();
        let cached = sidecar_store().load(&p, 1).unwrap();
        assert_eq!(
            cached,
            CachedArtifact {
                etag: None,
                last_modified: None,
                size_bytes: 1
            }
        );
    }

    #[test]
    fn save_then_clear_one_marker() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("foo.pkg");
        std::fs::write(&p, b"x").unwrap();
        let store = sidecar_store();
        store
            .save(&p, Some("\"abc123\""), Some("Wed, 21 Oct 2015 07:28:00 GMT"))
            .unwrap();
        let c = store.load(&p, 1).unwrap();
        assert_eq!(c.etag.as_deref(), Some("\"abc123\""));
        assert_eq!(c.last_modified.as_deref(), Some("Wed, 21 Oct 2015 07:28:00 GMT"));

        store.save(&p, Some("\"def\""), None).unwrap();
        let c = store.load(&p, 1).unwrap();
        assert_eq!(c.etag.as_deref(), Some("\"def\""));
        assert!(c.last_modified.is_none());
    }
}
