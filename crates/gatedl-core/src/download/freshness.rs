//! Freshness decision from the final response headers and the cached artifact.

use super::headers::ResponseHeaders;
use crate::error::{GatedlError, Result};

/// What to do with a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Server sent no validators (or size-only mode) and the length equals the cached size.
    SizeMatch { size: u64 },
    /// Server answered 304.
    NotModified,
    /// The transferred body is a new artifact.
    Changed,
}

/// Reject a success response whose advertised body is too small to be the real
/// artifact (typically an HTML "subscription required" page).
pub fn check_entitlement(headers: &ResponseHeaders, threshold: u64) -> Result<()> {
    if !headers.is_success() {
        return Ok(());
    }
    match headers.content_length() {
        Some(len) if len < threshold => Err(GatedlError::Entitlement {
            content_length: len,
            threshold,
        }),
        _ => Ok(()),
    }
}

/// Decide between skip and replace. `cached_size` is the size of the existing
/// non-empty artifact, if any.
pub fn decide(headers: &ResponseHeaders, cached_size: Option<u64>, check_filesize_only: bool) -> Freshness {
    let no_validators = headers.etag().is_none() && headers.last_modified().is_none();
    if no_validators || check_filesize_only {
        if let (Some(len), Some(size)) = (headers.content_length(), cached_size) {
            if len == size {
                return Freshness::SizeMatch { size };
            }
        }
    }
    if headers.is_not_modified() {
        return Freshness::NotModified;
    }
    Freshness::Changed
}
