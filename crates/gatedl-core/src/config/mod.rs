//! Global configuration (`~/.config/gatedl/config.toml`) and per-invocation recipes.

mod recipe;

pub use recipe::Recipe;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// How the download engine moves bytes: in-process libcurl on a worker thread,
/// or the curl executable as a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportBackend {
    #[default]
    Libcurl,
    Binary,
}

/// Where per-artifact ETag/Last-Modified markers are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    /// Extended file attributes on the artifact itself (Linux).
    #[default]
    Xattr,
    /// A small JSON file next to the artifact.
    Sidecar,
}

/// When a zero-byte cached artifact is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyArtifactCleanup {
    /// Delete it before the request is issued.
    #[default]
    Early,
    /// Leave it in place; it is treated as absent and overwritten on replace.
    Deferred,
}

/// Global configuration loaded from `~/.config/gatedl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatedlConfig {
    /// Transfer backend for the download step.
    pub transport: TransportBackend,
    /// Path to the curl executable used by the binary backend.
    pub curl_path: PathBuf,
    /// Successful bodies whose Content-Length is below this are treated as "access denied".
    pub entitlement_min_bytes: u64,
    /// Extra polls allowed after the transfer exits before headers are forced complete.
    pub header_poll_attempts: u32,
    /// Sleep between polls once headers are complete, in milliseconds.
    pub poll_interval_ms: u64,
    pub connect_timeout_secs: u64,
    /// Abort when the transfer stays below `low_speed_limit_bytes`/s for this long.
    pub low_speed_time_secs: u64,
    pub low_speed_limit_bytes: u32,
    pub metadata_backend: MetadataBackend,
    /// Attribute key prefix, e.g. `user.gatedl` → `user.gatedl.etag`.
    pub attribute_namespace: String,
    /// Regex searched in the login response body to detect rejected credentials.
    pub auth_failure_marker: String,
    /// Follow redirects when fetching the page to search.
    pub page_follow_redirects: bool,
    pub empty_artifact_cleanup: EmptyArtifactCleanup,
    /// Directory for the scoped cookie file (system temp dir when unset).
    pub cookie_dir: Option<PathBuf>,
}

impl Default for GatedlConfig {
    fn default() -> Self {
        Self {
            transport: TransportBackend::Libcurl,
            curl_path: PathBuf::from("/usr/bin/curl"),
            entitlement_min_bytes: 1000,
            header_poll_attempts: 15,
            poll_interval_ms: 100,
            connect_timeout_secs: 30,
            low_speed_time_secs: 30,
            low_speed_limit_bytes: 1,
            metadata_backend: MetadataBackend::Xattr,
            attribute_namespace: "user.gatedl".to_string(),
            auth_failure_marker: r"Incorrect\susername".to_string(),
            page_follow_redirects: true,
            empty_artifact_cleanup: EmptyArtifactCleanup::Early,
            cookie_dir: None,
        }
    }
}

impl GatedlConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn low_speed_time(&self) -> Duration {
        Duration::from_secs(self.low_speed_time_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("gatedl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Default download directory: `~/.cache/gatedl/downloads`.
pub fn default_download_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("gatedl")?;
    Ok(xdg_dirs.get_cache_home().join("downloads"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<GatedlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = GatedlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: GatedlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
