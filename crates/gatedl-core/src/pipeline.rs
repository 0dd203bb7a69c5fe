//! One invocation end to end: login, locate the download link, fetch it.
//!
//! The cookie store created here lives exactly as long as the invocation and
//! is removed on every exit path (it deletes itself on drop).

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::auth::Authenticator;
use crate::config::{self, GatedlConfig, Recipe};
use crate::cookie_store::CookieStore;
use crate::download::{ConditionalDownloader, DownloadRequest, SummaryRecord};
use crate::error::{GatedlError, Result};
use crate::page::PageResolver;
use crate::resolver::{Resolution, Resolver};

/// Values reported by [`find_and_download`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutput {
    /// Artifact path (the local override when one was given).
    pub pathname: PathBuf,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
    pub download_changed: bool,
    /// Extracted values keyed by output name (named groups included).
    pub matched: BTreeMap<String, Option<String>>,
    #[serde(
        rename = "gatedl_summary_result",
        skip_serializing_if = "Option::is_none"
    )]
    pub summary: Option<SummaryRecord>,
}

/// Fresh cookie store, seeded if the recipe carries cookies, then logged in.
pub fn open_session(recipe: &Recipe, cfg: &GatedlConfig) -> Result<CookieStore> {
    let mut cookies = CookieStore::create(cfg.cookie_dir.as_deref())?;
    if let Some(seed) = &recipe.cookie_input {
        cookies.seed(seed)?;
        tracing::debug!(bytes = seed.len(), "seeded cookie store");
    }
    Authenticator::from_config(cfg)?.authenticate(
        &recipe.login_url,
        &recipe.username,
        &recipe.password,
        &recipe.request_headers,
        &mut cookies,
    )?;
    Ok(cookies)
}

pub fn page_resolver(recipe: &Recipe, cfg: &GatedlConfig) -> Result<PageResolver> {
    Ok(PageResolver {
        page_url: recipe.url.clone(),
        pattern: PageResolver::compile(&recipe.re_pattern, &recipe.re_flags)?,
        output_key: recipe.result_output_var_name.clone(),
        headers: recipe.request_headers.clone(),
        filename: recipe.filename.clone(),
        follow_redirects: cfg.page_follow_redirects,
        connect_timeout: cfg.connect_timeout(),
    })
}

/// What a successful login left behind; values are never shown, only sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub token_len: usize,
    pub cookie_lines: usize,
}

/// Log in and only check that the credentials are accepted.
pub fn login(recipe: &Recipe, cfg: &GatedlConfig) -> Result<SessionInfo> {
    recipe.validate()?;
    let cookies = open_session(recipe, cfg)?;
    let jar = cookies.contents()?;
    let info = SessionInfo {
        token_len: cookies.session_token().map(str::len).unwrap_or(0),
        cookie_lines: jar.lines().filter(|l| is_cookie_line(l)).count(),
    };
    cookies.close()?;
    Ok(info)
}

/// Netscape jar entry (comments skipped, `#HttpOnly_` entries kept).
fn is_cookie_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && (!line.starts_with('#') || line.starts_with("#HttpOnly_"))
}

/// Log in and locate the download link without downloading it.
pub fn find(recipe: &Recipe, cfg: &GatedlConfig) -> Result<Resolution> {
    recipe.validate()?;
    let resolver = page_resolver(recipe, cfg)?;
    let cookies = open_session(recipe, cfg)?;
    let resolution = resolver.resolve(&cookies)?;
    cookies.close()?;
    Ok(resolution)
}

/// Full run: login → page match → conditional download.
pub fn find_and_download(recipe: &Recipe, cfg: &GatedlConfig) -> Result<RunOutput> {
    recipe.validate()?;
    let resolver = page_resolver(recipe, cfg)?;
    let download_dir = match &recipe.download_dir {
        Some(dir) => dir.clone(),
        None => config::default_download_dir()
            .map_err(|e| GatedlError::InvalidInput(format!("{:#}", e)))?,
    };
    let local = recipe.local_override();

    let cookies = open_session(recipe, cfg)?;
    let resolution = resolver.resolve(&cookies)?;

    let downloader = ConditionalDownloader::from_config(cfg, recipe.curl_path.as_deref());
    let report = downloader.download(
        &DownloadRequest {
            target: &resolution.target,
            download_dir: &download_dir,
            check_filesize_only: recipe.check_filesize_only,
            local_override: local.as_deref(),
        },
        &cookies,
    )?;
    cookies.close()?;

    Ok(RunOutput {
        download_changed: report.changed(),
        pathname: report.artifact_path,
        last_modified: report.last_modified,
        etag: report.etag,
        matched: resolution.matched,
        summary: report.summary,
    })
}
