//! `gatedl login` – verify credentials.

use anyhow::{Context, Result};
use gatedl_core::config::{GatedlConfig, Recipe};
use gatedl_core::pipeline;

pub async fn run_login(cfg: GatedlConfig, recipe: Recipe) -> Result<()> {
    let user = recipe.username.clone();
    let info = tokio::task::spawn_blocking(move || pipeline::login(&recipe, &cfg))
        .await
        .context("login task panicked")??;
    println!(
        "Logged in as {} (session token: {} bytes, {} cookie(s) stored).",
        user, info.token_len, info.cookie_lines
    );
    Ok(())
}
