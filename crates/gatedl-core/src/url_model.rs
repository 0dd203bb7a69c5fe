//! Artifact filename derivation.
//!
//! The filename defaults to the URL's final path segment (percent-decoding is
//! not applied, query strings are dropped) and is made safe for a Linux
//! filesystem before use.

/// Used when neither the override nor the URL yields a usable name.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Last non-empty path segment of `url`, for HTTP(S) and FTP URLs alike.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    match segment {
        "." | ".." => None,
        s => Some(s.to_string()),
    }
}

/// Replaces path separators, NUL and control characters with `_`; trims dots and spaces.
pub fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255;
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let mut out = replaced.trim_matches(|c| c == ' ' || c == '.').to_string();
    if out.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while !out.is_char_boundary(take) {
            take -= 1;
        }
        out.truncate(take);
    }
    out
}

/// Filename for the artifact at `url`: the override if given, else the URL tail.
pub fn artifact_filename(url: &str, filename_override: Option<&str>) -> String {
    let raw = filename_override
        .map(str::to_string)
        .or_else(|| filename_from_url(url));
    match raw.map(|r| sanitize_filename(&r)) {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_FILENAME.to_string(),
    }
}
