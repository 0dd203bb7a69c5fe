//! `gatedl meta` – show stored freshness markers of an artifact.

use anyhow::{bail, Result};
use gatedl_core::config::GatedlConfig;
use gatedl_core::metadata::MetadataStore;
use gatedl_core::storage;
use std::path::Path;

pub fn run_meta(cfg: &GatedlConfig, path: &Path) -> Result<()> {
    let size = match storage::existing_size(path)? {
        Some(size) => size,
        None => bail!("no artifact at {}", path.display()),
    };
    let cached = MetadataStore::from_config(cfg).load(path, size)?;
    println!("{:<14} {}", "path", path.display());
    println!("{:<14} {}", "size", cached.size_bytes);
    println!("{:<14} {}", "etag", cached.etag.as_deref().unwrap_or("-"));
    println!(
        "{:<14} {}",
        "last-modified",
        cached.last_modified.as_deref().unwrap_or("-")
    );
    Ok(())
}
