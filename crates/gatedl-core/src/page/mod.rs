//! Fetch a page with the session cookie and locate the download link in it.

mod flags;
mod matcher;

pub use flags::PatternFlags;
pub use matcher::{first_match, PageMatch};

use regex::Regex;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::cookie_store::CookieStore;
use crate::error::{GatedlError, Result};
use crate::http::{self, ExchangeRequest};
use crate::resolver::{Resolution, Resolver, TargetDescriptor};

/// Fetch `url` using (and updating) the cookie store, then search its body.
pub fn fetch_and_match(
    url: &str,
    cookies: &CookieStore,
    headers: &BTreeMap<String, String>,
    re: &Regex,
    follow_redirects: bool,
    connect_timeout: Duration,
) -> Result<PageMatch> {
    let page = http::exchange(
        &ExchangeRequest {
            url,
            headers,
            post_fields: None,
            follow_redirects,
            connect_timeout,
        },
        cookies,
    )?;
    tracing::debug!(url, status = page.status, bytes = page.body.len(), "fetched page");

    first_match(re, &page.body_text()).ok_or_else(|| GatedlError::NoMatch {
        url: url.to_string(),
    })
}

/// Resolve a possibly relative link against the page it was found on.
pub fn absolute_link(page_url: &str, link: &str) -> String {
    match url::Url::parse(link) {
        Ok(_) => link.to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => url::Url::parse(page_url)
            .and_then(|base| base.join(link))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| link.to_string()),
        Err(_) => link.to_string(),
    }
}

/// [`Resolver`] that searches one page for the download link.
#[derive(Debug)]
pub struct PageResolver {
    pub page_url: String,
    pub pattern: Regex,
    pub output_key: String,
    pub headers: BTreeMap<String, String>,
    pub filename: Option<String>,
    pub follow_redirects: bool,
    pub connect_timeout: Duration,
}

impl PageResolver {
    /// Compile `pattern` with the given flag names.
    pub fn compile<S: AsRef<str>>(pattern: &str, flags: &[S]) -> Result<Regex> {
        Ok(PatternFlags::parse(flags).compile(pattern)?)
    }

    /// Turn a page match into a target and its reported values.
    pub fn resolution(&self, found: &PageMatch) -> Resolution {
        let url = absolute_link(&self.page_url, &found.value);
        tracing::info!(url = %url, "found download link");
        Resolution {
            target: TargetDescriptor {
                url,
                filename: self.filename.clone(),
                expected_headers: self.headers.clone(),
            },
            matched: found.output_values(&self.output_key),
        }
    }
}

impl Resolver for PageResolver {
    fn resolve(&self, cookies: &CookieStore) -> Result<Resolution> {
        let found = fetch_and_match(
            &self.page_url,
            cookies,
            &self.headers,
            &self.pattern,
            self.follow_redirects,
            self.connect_timeout,
        )?;
        Ok(self.resolution(&found))
    }
}
