//! The conditional download engine.

use std::collections::BTreeMap;
use std::path::Path;
use std::thread;

use super::freshness::{self, Freshness};
use super::headers::{HeaderCapture, ResponseHeaders};
use super::transport::{
    CurlBinaryTransport, LibcurlTransport, LinePoll, Transfer, TransferExit, TransferRequest,
    Transport,
};
use super::{DownloadOutcome, DownloadPolicy, DownloadReport, DownloadRequest, SkipReason, SummaryRecord};
use crate::config::{EmptyArtifactCleanup, GatedlConfig, TransportBackend};
use crate::cookie_store::CookieStore;
use crate::error::{GatedlError, Result};
use crate::metadata::{CachedArtifact, MetadataStore};
use crate::storage::{self, PartFile};
use crate::url_model;

pub struct ConditionalDownloader {
    transport: Box<dyn Transport>,
    metadata: MetadataStore,
    policy: DownloadPolicy,
}

impl ConditionalDownloader {
    pub fn new(transport: Box<dyn Transport>, metadata: MetadataStore, policy: DownloadPolicy) -> Self {
        Self {
            transport,
            metadata,
            policy,
        }
    }

    /// Engine for `cfg`. A `curl_path` selects the curl executable backend
    /// regardless of `cfg.transport`.
    pub fn from_config(cfg: &GatedlConfig, curl_path: Option<&Path>) -> Self {
        let transport: Box<dyn Transport> = match (cfg.transport, curl_path) {
            (TransportBackend::Libcurl, None) => Box::new(LibcurlTransport::from_config(cfg)),
            (_, path) => Box::new(CurlBinaryTransport::from_config(
                cfg,
                path.map(Path::to_path_buf),
            )),
        };
        Self::new(
            transport,
            MetadataStore::from_config(cfg),
            DownloadPolicy::from_config(cfg),
        )
    }

    pub fn download(&self, req: &DownloadRequest<'_>, cookies: &CookieStore) -> Result<DownloadReport> {
        if let Some(local) = req.local_override {
            tracing::info!(path = %local.display(), "using local artifact, skipping download");
            return Ok(DownloadReport {
                artifact_path: local.to_path_buf(),
                outcome: DownloadOutcome::LocalOverride,
                etag: None,
                last_modified: None,
                summary: None,
            });
        }

        storage::ensure_dir(req.download_dir)?;
        let filename =
            url_model::artifact_filename(&req.target.url, req.target.filename.as_deref());
        let artifact_path = req.download_dir.join(filename);

        let cached = self.cached_artifact(&artifact_path)?;
        let headers = conditional_headers(&req.target.expected_headers, cached.as_ref());

        let part = PartFile::create_adjacent(&artifact_path)?;
        tracing::info!(
            url = %req.target.url,
            path = %artifact_path.display(),
            conditional = cached.is_some(),
            "downloading"
        );
        let (response, exit) = {
            let mut transfer = self.transport.start(&TransferRequest {
                url: &req.target.url,
                headers: &headers,
                cookie_file: cookies.path(),
                output: part.path(),
            })?;
            self.await_transfer(transfer.as_mut(), &req.target.url)
        };

        if !exit.is_success() {
            tracing::warn!(url = %req.target.url, code = exit.code, error = %exit.message, "transfer failed");
            return Err(GatedlError::Transport {
                code: exit.code,
                message: exit.message,
            });
        }
        tracing::debug!(
            status = %response.status_code,
            text = %response.status_text,
            fields = response.fields().len(),
            "final response headers"
        );
        freshness::check_entitlement(&response, self.policy.entitlement_min_bytes)?;

        let cached_size = cached.as_ref().map(|c| c.size_bytes);
        match freshness::decide(&response, cached_size, req.check_filesize_only) {
            Freshness::SizeMatch { size } => {
                tracing::info!(
                    path = %artifact_path.display(),
                    size,
                    "local size matches content-length, keeping existing artifact"
                );
                tracing::warn!("matching sizes do not guarantee identical content");
                part.discard()?;
                Ok(skipped(artifact_path, SkipReason::SizeMatch, cached))
            }
            Freshness::NotModified => {
                tracing::info!(url = %req.target.url, "not modified since last download");
                part.discard()?;
                Ok(skipped(artifact_path, SkipReason::NotModified, cached))
            }
            Freshness::Changed => self.replace(part, artifact_path, &response),
        }
    }

    fn replace(
        &self,
        part: PartFile,
        artifact_path: std::path::PathBuf,
        response: &ResponseHeaders,
    ) -> Result<DownloadReport> {
        let size_bytes = part.len()?;
        part.finalize(&artifact_path)?;
        let etag = response.etag().map(str::to_string);
        let last_modified = response.last_modified().map(str::to_string);
        tracing::info!(etag = ?etag, last_modified = ?last_modified, "storing freshness markers");
        self.metadata
            .save(&artifact_path, etag.as_deref(), last_modified.as_deref())?;
        tracing::info!(path = %artifact_path.display(), size_bytes, "downloaded new artifact");
        Ok(DownloadReport {
            summary: Some(SummaryRecord::new(&artifact_path)),
            artifact_path,
            outcome: DownloadOutcome::Replaced { size_bytes },
            etag,
            last_modified,
        })
    }

    /// Markers of a usable existing artifact. A zero-byte artifact never counts.
    fn cached_artifact(&self, path: &Path) -> Result<Option<CachedArtifact>> {
        match storage::existing_size(path)? {
            None => Ok(None),
            Some(0) => {
                match self.policy.empty_artifact_cleanup {
                    EmptyArtifactCleanup::Early => {
                        storage::remove_if_empty(path)?;
                        self.metadata.forget(path)?;
                        tracing::info!(path = %path.display(), "removed empty artifact");
                    }
                    EmptyArtifactCleanup::Deferred => {
                        tracing::debug!(path = %path.display(), "empty artifact will be overwritten");
                    }
                }
                Ok(None)
            }
            Some(size) => self.metadata.load(path, size).map(Some),
        }
    }

    /// Consume header lines until capture completes, then wait for the
    /// transfer to finish. After the transfer exits, a bounded number of idle
    /// polls is allowed before the headers are taken as they are.
    fn await_transfer(&self, transfer: &mut dyn Transfer, url: &str) -> (ResponseHeaders, TransferExit) {
        let interval = self.policy.poll_interval;
        let mut capture = HeaderCapture::for_url(url);
        let mut attempts_left = self.policy.header_poll_attempts;

        loop {
            if capture.is_complete() {
                if let Some(exit) = transfer.try_exit() {
                    return (capture.into_headers(), exit);
                }
                thread::sleep(interval);
                continue;
            }

            let polled = transfer.next_line(interval);
            let consumed = match &polled {
                LinePoll::Line(line) => {
                    let kind = capture.feed(line);
                    tracing::trace!(line = %line, ?kind, "header line");
                    true
                }
                LinePoll::Idle | LinePoll::Closed => false,
            };
            if capture.is_complete() {
                continue;
            }

            match transfer.try_exit() {
                Some(exit) if !consumed => {
                    attempts_left = attempts_left.saturating_sub(1);
                    if attempts_left == 0 {
                        tracing::debug!(
                            status = %capture.headers().status_code,
                            "transfer ended before the header block did"
                        );
                        capture.force_complete();
                        return (capture.into_headers(), exit);
                    }
                }
                Some(_) => {}
                None if polled == LinePoll::Closed => thread::sleep(interval),
                None => {}
            }
        }
    }
}

fn conditional_headers(
    base: &BTreeMap<String, String>,
    cached: Option<&CachedArtifact>,
) -> BTreeMap<String, String> {
    let mut headers = base.clone();
    if let Some(cached) = cached {
        if let Some(etag) = &cached.etag {
            headers.insert("If-None-Match".to_string(), etag.clone());
        }
        if let Some(lm) = &cached.last_modified {
            headers.insert("If-Modified-Since".to_string(), lm.clone());
        }
    }
    headers
}

fn skipped(
    artifact_path: std::path::PathBuf,
    reason: SkipReason,
    cached: Option<CachedArtifact>,
) -> DownloadReport {
    let cached = cached.unwrap_or_default();
    DownloadReport {
        artifact_path,
        outcome: DownloadOutcome::Skipped(reason),
        etag: cached.etag,
        last_modified: cached.last_modified,
        summary: None,
    }
}
