//! Resolver interface for turning a gated page into a direct download target.
//!
//! The download engine only depends on [`TargetDescriptor`] and does not know
//! how the URL was found.

use std::collections::BTreeMap;

use crate::cookie_store::CookieStore;
use crate::error::Result;

/// What to download; immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub url: String,
    /// Overrides the URL's last path segment as the artifact filename.
    pub filename: Option<String>,
    /// Extra request headers for the download.
    pub expected_headers: BTreeMap<String, String>,
}

/// A target plus the values extracted while finding it, keyed by output name.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub target: TargetDescriptor,
    pub matched: BTreeMap<String, Option<String>>,
}

/// Implemented by anything that can locate a download with an authenticated session.
pub trait Resolver {
    fn resolve(&self, cookies: &CookieStore) -> Result<Resolution>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_descriptor_holds_url_and_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("Referer".to_string(), "https://forum.example.com/".to_string());
        let target = TargetDescriptor {
            url: "https://cdn.example.com/file.dmg".to_string(),
            filename: None,
            expected_headers: headers,
        };
        let copy = target.clone();
        assert_eq!(copy, target);
        assert_eq!(
            copy.expected_headers.get("Referer").map(String::as_str),
            Some("https://forum.example.com/")
        );
    }
}
