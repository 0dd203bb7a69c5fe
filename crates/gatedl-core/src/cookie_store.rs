//! Scoped cookie store shared by the login, page fetch and download requests.
//!
//! The store is a private temp file in Netscape cookie-jar format that libcurl
//! (or the curl executable) reads with `-b` and rewrites with `-c`. It exists
//! only for the duration of one invocation and is removed when dropped, on
//! every exit path.

use std::fs;
use std::path::Path;
use tempfile::TempPath;

use crate::error::{GatedlError, Result};

const PREFIX: &str = "gatedl-cookies-";

pub struct CookieStore {
    path: TempPath,
    session_token: Option<String>,
}

impl CookieStore {
    /// Create an empty store in `dir`, or in the system temp dir when `None`.
    pub fn create(dir: Option<&Path>) -> Result<CookieStore> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let file = match dir {
            Some(d) => {
                fs::create_dir_all(d).map_err(|source| GatedlError::Directory {
                    path: d.to_path_buf(),
                    source,
                })?;
                builder.tempfile_in(d)
            }
            None => builder.tempfile(),
        }
        .map_err(|e| GatedlError::storage("create cookie store", e))?;

        let path = file.into_temp_path();
        tracing::debug!(path = %path.display(), "created cookie store");
        Ok(CookieStore {
            path,
            session_token: None,
        })
    }

    /// Replace the store contents with caller-provided cookie text.
    pub fn seed(&self, contents: &str) -> Result<()> {
        fs::write(&self.path, contents)
            .map_err(|e| GatedlError::storage("seed cookie store", e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current jar contents as written by the transport.
    pub fn contents(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| GatedlError::storage("read cookie store", e))
    }

    /// Session token recorded by the authenticator (the last `Set-Cookie` value).
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub(crate) fn set_session_token(&mut self, token: String) {
        self.session_token = Some(token);
    }

    /// Remove the backing file now, reporting any failure.
    pub fn close(self) -> Result<()> {
        self.path
            .close()
            .map_err(|e| GatedlError::storage("remove cookie store", e))
    }
}

impl std::fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieStore")
            .field("path", &self.path.display())
            .field("has_session_token", &self.session_token.is_some())
            .finish()
    }
}
