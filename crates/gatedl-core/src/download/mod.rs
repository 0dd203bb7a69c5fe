//! Conditional download of a resolved target into the download directory.
//!
//! The engine sends conditional headers derived from the stored markers,
//! watches the response headers while the body streams into a private temp
//! file, and then either discards the temp file (unchanged) or renames it over
//! the artifact and records the new markers.

mod engine;
pub mod freshness;
pub mod headers;
pub mod transport;

pub use engine::ConditionalDownloader;
pub use freshness::Freshness;
pub use headers::{HeaderCapture, ResponseHeaders};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::config::{EmptyArtifactCleanup, GatedlConfig};
use crate::resolver::TargetDescriptor;

/// Heading of the summary record emitted for a new artifact.
pub const SUMMARY_TEXT: &str = "The following new items were downloaded:";

/// Tunables for one engine; see the matching [`GatedlConfig`] fields.
#[derive(Debug, Clone)]
pub struct DownloadPolicy {
    pub entitlement_min_bytes: u64,
    pub header_poll_attempts: u32,
    pub poll_interval: Duration,
    pub empty_artifact_cleanup: EmptyArtifactCleanup,
}

impl DownloadPolicy {
    pub fn from_config(cfg: &GatedlConfig) -> Self {
        Self {
            entitlement_min_bytes: cfg.entitlement_min_bytes,
            header_poll_attempts: cfg.header_poll_attempts,
            poll_interval: cfg.poll_interval(),
            empty_artifact_cleanup: cfg.empty_artifact_cleanup,
        }
    }
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self::from_config(&GatedlConfig::default())
    }
}

/// Inputs of one download.
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    pub target: &'a TargetDescriptor,
    pub download_dir: &'a Path,
    /// Compare sizes even when the server sends validators.
    pub check_filesize_only: bool,
    /// Pre-supplied artifact; when set nothing is fetched.
    pub local_override: Option<&'a Path>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SizeMatch,
    NotModified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Existing artifact kept; the transferred body was discarded.
    Skipped(SkipReason),
    /// A new artifact replaced (or created) the canonical file.
    Replaced { size_bytes: u64 },
    /// The caller supplied the artifact.
    LocalOverride,
}

/// Emitted only when a new artifact was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRecord {
    pub summary_text: String,
    pub data: SummaryData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryData {
    pub download_path: PathBuf,
}

impl SummaryRecord {
    pub fn new(download_path: &Path) -> Self {
        Self {
            summary_text: SUMMARY_TEXT.to_string(),
            data: SummaryData {
                download_path: download_path.to_path_buf(),
            },
        }
    }
}

/// Result of a download. `etag`/`last_modified` are the new markers on
/// replace and the stored ones on skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub artifact_path: PathBuf,
    pub outcome: DownloadOutcome,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub summary: Option<SummaryRecord>,
}

impl DownloadReport {
    pub fn changed(&self) -> bool {
        !matches!(self.outcome, DownloadOutcome::Skipped(_))
    }
}
