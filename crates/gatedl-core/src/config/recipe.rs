//! Per-invocation inputs: credentials, URLs, pattern and download options.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::GatedlError;

fn default_output_key() -> String {
    "match".to_string()
}

/// One login → match → download job, usually read from a TOML file.
#[derive(Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub username: String,
    pub password: String,
    /// Endpoint receiving the form-encoded login POST.
    pub login_url: String,
    /// Page searched for the download link.
    pub url: String,
    pub re_pattern: String,
    /// Flag names such as `IGNORECASE`, `MULTILINE`, `DOTALL`, `VERBOSE`.
    #[serde(default)]
    pub re_flags: Vec<String>,
    /// Key under which the matched value is reported.
    #[serde(default = "default_output_key")]
    pub result_output_var_name: String,
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Overrides the URL's last path segment as the artifact filename.
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub check_filesize_only: bool,
    /// Local artifact to use instead of downloading.
    #[serde(default)]
    pub pkg: Option<PathBuf>,
    /// Overrides the configured curl executable.
    #[serde(default)]
    pub curl_path: Option<PathBuf>,
    /// Initial cookie store contents.
    #[serde(default)]
    pub cookie_input: Option<String>,
}

impl std::fmt::Debug for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recipe")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("login_url", &self.login_url)
            .field("url", &self.url)
            .field("re_pattern", &self.re_pattern)
            .field("re_flags", &self.re_flags)
            .field("result_output_var_name", &self.result_output_var_name)
            .field("download_dir", &self.download_dir)
            .field("filename", &self.filename)
            .field("check_filesize_only", &self.check_filesize_only)
            .field("pkg", &self.pkg)
            .finish_non_exhaustive()
    }
}

impl Recipe {
    /// Read a recipe from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Recipe> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read recipe: {}", path.display()))?;
        let recipe: Recipe =
            toml::from_str(&data).with_context(|| format!("parse recipe: {}", path.display()))?;
        Ok(recipe)
    }

    /// Checks required fields before any network activity.
    pub fn validate(&self) -> Result<(), GatedlError> {
        if self.username.trim().is_empty() {
            return Err(GatedlError::InvalidInput("username is empty".into()));
        }
        if self.password.is_empty() {
            return Err(GatedlError::InvalidInput("password is empty".into()));
        }
        for (name, value) in [("login_url", &self.login_url), ("url", &self.url)] {
            url::Url::parse(value)
                .map_err(|e| GatedlError::InvalidInput(format!("{name} {value:?}: {e}")))?;
        }
        if self.re_pattern.is_empty() {
            return Err(GatedlError::InvalidInput("re_pattern is empty".into()));
        }
        if self.result_output_var_name.trim().is_empty() {
            return Err(GatedlError::InvalidInput(
                "result_output_var_name is empty".into(),
            ));
        }
        if let Some(name) = &self.filename {
            if name.is_empty() || name.contains('/') || name == "." || name == ".." {
                return Err(GatedlError::InvalidInput(format!(
                    "filename {name:?} is not a plain file name"
                )));
            }
        }
        Ok(())
    }

    /// `pkg` with a leading `~` expanded to `$HOME`.
    pub fn local_override(&self) -> Option<PathBuf> {
        let pkg = self.pkg.as_ref()?;
        if let Ok(rest) = pkg.strip_prefix("~") {
            if let Some(home) = std::env::var_os("HOME") {
                return Some(PathBuf::from(home).join(rest));
            }
        }
        Some(pkg.clone())
    }
}
