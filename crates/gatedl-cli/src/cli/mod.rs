//! CLI for gatedl.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gatedl_core::config::{self, Recipe};
use std::path::PathBuf;

use commands::{run_find, run_login, run_meta, run_recipe, RunOverrides};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gatedl")]
#[command(
    about = "gatedl: log in to a forum, find a gated download link and fetch it only when it changed",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Log in, find the link and download it if it changed. Prints the result as JSON.
    Run {
        /// Recipe file (TOML).
        recipe: PathBuf,
        /// Directory for the artifact (overrides the recipe).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,
        /// Decide freshness by size even when the server sends ETag/Last-Modified.
        #[arg(long)]
        check_filesize_only: bool,
        /// Use this local file instead of downloading.
        #[arg(long, value_name = "PATH")]
        pkg: Option<PathBuf>,
        /// Download with this curl executable instead of in-process libcurl.
        #[arg(long, value_name = "PATH")]
        curl_path: Option<PathBuf>,
    },

    /// Only check that the recipe's credentials are accepted.
    Login {
        /// Recipe file (TOML).
        recipe: PathBuf,
    },

    /// Log in and print the download link the pattern finds, without downloading.
    Find {
        /// Recipe file (TOML).
        recipe: PathBuf,
    },

    /// Show the stored ETag/Last-Modified of a downloaded artifact.
    Meta {
        /// Path to the artifact.
        path: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                recipe,
                download_dir,
                check_filesize_only,
                pkg,
                curl_path,
            } => {
                let overrides = RunOverrides {
                    download_dir,
                    check_filesize_only,
                    pkg,
                    curl_path,
                };
                let recipe = overrides.apply(Recipe::load(&recipe)?);
                run_recipe(cfg, recipe).await?;
            }
            CliCommand::Login { recipe } => run_login(cfg, Recipe::load(&recipe)?).await?,
            CliCommand::Find { recipe } => run_find(cfg, Recipe::load(&recipe)?).await?,
            CliCommand::Meta { path } => run_meta(&cfg, &path)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
