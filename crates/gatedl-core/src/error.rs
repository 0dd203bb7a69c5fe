//! Error taxonomy for one login → match → download invocation.
//!
//! Every variant is terminal: the pipeline never retries and never returns a
//! partial success. A freshness skip is not an error.

use std::path::PathBuf;

/// Errors produced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum GatedlError {
    /// The login response carried the "incorrect credentials" marker.
    #[error("incorrect forum credentials for user {user}")]
    Authentication { user: String },

    /// The login exchange succeeded but no `Set-Cookie` header was seen.
    #[error("no cookies found in login response headers from {url}")]
    NoCookie { url: String },

    /// Page fetch or login request failed at the transport level.
    #[error("could not retrieve URL {url}: {message}")]
    Fetch { url: String, message: String },

    /// The download transfer exited with a nonzero code.
    #[error("curl failure: {message} (exit code {code})")]
    Transport { code: i32, message: String },

    /// The search pattern did not match the fetched page.
    #[error("no match found on URL: {url}")]
    NoMatch { url: String },

    /// The pattern (or one of its flags) could not be compiled.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The download directory could not be created.
    #[error("can't create {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A 2xx response was implausibly small; access was most likely not granted.
    #[error(
        "content-length of {content_length} bytes (below {threshold}) suggests download not authorised; perhaps the subscription has expired"
    )]
    Entitlement { content_length: u64, threshold: u64 },

    /// Recipe failed validation at entry.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Temp file, rename or permission failure around the artifact.
    #[error("storage: {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing freshness markers beside the artifact failed.
    #[error("metadata for {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GatedlError {
    pub(crate) fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        GatedlError::Storage {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatedlError>;
