//! Forum login: one form-encoded POST through a fresh cookie store.
//!
//! Credentials are sent as `username`, `password` and `rememberme=forever`.
//! A response body matching the failure marker means the forum rejected the
//! credentials. Otherwise the last `Set-Cookie` value seen (across redirect
//! hops) is the session token; the jar file itself holds the full state.

use regex::Regex;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::GatedlConfig;
use crate::cookie_store::CookieStore;
use crate::error::{GatedlError, Result};
use crate::http::{self, ExchangeRequest, HttpExchange};

pub struct Authenticator {
    failure_marker: Regex,
    connect_timeout: Duration,
}

impl Authenticator {
    pub fn new(failure_marker: &str, connect_timeout: Duration) -> Result<Self> {
        Ok(Self {
            failure_marker: Regex::new(failure_marker)?,
            connect_timeout,
        })
    }

    pub fn from_config(cfg: &GatedlConfig) -> Result<Self> {
        Self::new(&cfg.auth_failure_marker, cfg.connect_timeout())
    }

    /// Log in and record the session token on `cookies`.
    pub fn authenticate(
        &self,
        login_url: &str,
        username: &str,
        password: &str,
        headers: &BTreeMap<String, String>,
        cookies: &mut CookieStore,
    ) -> Result<()> {
        let body = login_form(username, password);
        tracing::debug!(url = login_url, user = username, "posting login form");
        let response = http::exchange(
            &ExchangeRequest {
                url: login_url,
                headers,
                post_fields: Some(&body),
                follow_redirects: true,
                connect_timeout: self.connect_timeout,
            },
            cookies,
        )?;

        let token = self.session_token(&response, login_url, username)?;
        tracing::info!(
            user = username,
            token_len = token.len(),
            "forum authorisation successful"
        );
        cookies.set_session_token(token);
        Ok(())
    }

    /// Applies the failure marker and extracts the last `Set-Cookie` value.
    fn session_token(&self, response: &HttpExchange, url: &str, username: &str) -> Result<String> {
        if self.failure_marker.is_match(&response.body_text()) {
            return Err(GatedlError::Authentication {
                user: username.to_string(),
            });
        }
        http::last_header_value(&response.header_lines, "set-cookie")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GatedlError::NoCookie {
                url: url.to_string(),
            })
    }
}

/// `application/x-www-form-urlencoded` login body.
pub fn login_form(username: &str, password: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("username", username)
        .append_pair("password", password)
        .append_pair("rememberme", "forever")
        .finish()
}
