//! One buffered HTTP exchange through libcurl, sharing the cookie store.
//!
//! Used for the small requests around the download: the login POST and the
//! page fetch. The cookie store is both read (`CURLOPT_COOKIEFILE`) and
//! rewritten (`CURLOPT_COOKIEJAR`), so `Set-Cookie` responses update it.
//! Runs in the current thread; call from `spawn_blocking` if used from async code.

mod parse;

pub use parse::{header_values, last_header_value};
pub(crate) use parse::header_line;

use std::collections::BTreeMap;
use std::time::Duration;

use crate::cookie_store::CookieStore;
use crate::error::{GatedlError, Result};

/// Request options for [`exchange`].
#[derive(Debug, Clone)]
pub struct ExchangeRequest<'a> {
    pub url: &'a str,
    pub headers: &'a BTreeMap<String, String>,
    /// Form-encoded POST body; a GET is issued when `None`.
    pub post_fields: Option<&'a str>,
    pub follow_redirects: bool,
    pub connect_timeout: Duration,
}

/// Response of a completed exchange.
#[derive(Debug, Clone)]
pub struct HttpExchange {
    /// Final HTTP status (after redirects when followed).
    pub status: u32,
    /// Every header line seen, across redirect hops, without line endings.
    pub header_lines: Vec<String>,
    pub body: Vec<u8>,
}

impl HttpExchange {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// `Name: value` lines for a curl header list.
pub(crate) fn header_list(headers: &BTreeMap<String, String>) -> Result<curl::easy::List> {
    let mut list = curl::easy::List::new();
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(|e| curl_setup_error("header list", e))?;
    }
    Ok(list)
}

fn curl_setup_error(what: &str, e: curl::Error) -> GatedlError {
    GatedlError::Fetch {
        url: String::new(),
        message: format!("curl setup ({}): {}", what, e),
    }
}

/// Text for a libcurl error: description plus extra detail when present.
pub(crate) fn curl_error_text(e: &curl::Error) -> String {
    match e.extra_description() {
        Some(extra) => format!("{}: {}", e.description(), extra),
        None => e.description().to_string(),
    }
}

/// Perform one request with the cookie store attached and collect headers and body.
pub fn exchange(req: &ExchangeRequest<'_>, cookies: &CookieStore) -> Result<HttpExchange> {
    let fetch_err = |e: curl::Error| GatedlError::Fetch {
        url: req.url.to_string(),
        message: curl_error_text(&e),
    };

    let mut header_lines: Vec<String> = Vec::new();
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(req.url).map_err(fetch_err)?;
    easy.follow_location(req.follow_redirects).map_err(fetch_err)?;
    easy.connect_timeout(req.connect_timeout).map_err(fetch_err)?;
    easy.cookie_file(cookies.path()).map_err(fetch_err)?;
    easy.cookie_jar(cookies.path()).map_err(fetch_err)?;
    if let Some(fields) = req.post_fields {
        easy.post(true).map_err(fetch_err)?;
        easy.post_fields_copy(fields.as_bytes()).map_err(fetch_err)?;
    }
    if !req.headers.is_empty() {
        easy.http_headers(header_list(req.headers)?).map_err(fetch_err)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                header_lines.push(header_line(data));
                true
            })
            .map_err(fetch_err)?;
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(fetch_err)?;
        transfer.perform().map_err(fetch_err)?;
    }

    let status = easy.response_code().map_err(fetch_err)?;
    // Dropping the handle flushes the cookie jar to disk.
    drop(easy);

    tracing::debug!(
        url = req.url,
        status,
        header_lines = header_lines.len(),
        body_bytes = body.len(),
        "exchange complete"
    );

    Ok(HttpExchange {
        status,
        header_lines,
        body,
    })
}
