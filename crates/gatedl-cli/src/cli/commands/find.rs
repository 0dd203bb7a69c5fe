//! `gatedl find` – print the resolved download link and matched values as JSON.

use anyhow::{Context, Result};
use gatedl_core::config::{GatedlConfig, Recipe};
use gatedl_core::pipeline;
use serde_json::json;

pub async fn run_find(cfg: GatedlConfig, recipe: Recipe) -> Result<()> {
    let resolution = tokio::task::spawn_blocking(move || pipeline::find(&recipe, &cfg))
        .await
        .context("find task panicked")??;
    let out = json!({
        "url": resolution.target.url,
        "matched": resolution.matched,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
