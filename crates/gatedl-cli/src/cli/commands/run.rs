//! `gatedl run` – full login → match → download.

use anyhow::{Context, Result};
use gatedl_core::config::{GatedlConfig, Recipe};
use gatedl_core::pipeline;
use std::path::PathBuf;

/// Command-line values that take precedence over the recipe.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub download_dir: Option<PathBuf>,
    pub check_filesize_only: bool,
    pub pkg: Option<PathBuf>,
    pub curl_path: Option<PathBuf>,
}

impl RunOverrides {
    pub fn apply(self, mut recipe: Recipe) -> Recipe {
        if self.download_dir.is_some() {
            recipe.download_dir = self.download_dir;
        }
        if self.check_filesize_only {
            recipe.check_filesize_only = true;
        }
        if self.pkg.is_some() {
            recipe.pkg = self.pkg;
        }
        if self.curl_path.is_some() {
            recipe.curl_path = self.curl_path;
        }
        recipe
    }
}

pub async fn run_recipe(cfg: GatedlConfig, recipe: Recipe) -> Result<()> {
    let output = tokio::task::spawn_blocking(move || pipeline::find_and_download(&recipe, &cfg))
        .await
        .context("download task panicked")??;
    if let Some(summary) = &output.summary {
        eprintln!("{} {}", summary.summary_text, summary.data.download_path.display());
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
