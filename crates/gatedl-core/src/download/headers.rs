//! Incremental classification of a transfer's header stream.
//!
//! Lines arrive one at a time from the transport (HTTP status lines, `name:
//! value` fields, blank separators, or FTP numeric replies). Redirect hops
//! restart capture so only the final response's headers survive.

/// Statuses after which more headers follow (the transport follows the redirect itself).
pub const REDIRECT_CODES: &[&str] = &["301", "302", "303", "307", "308"];

/// Status recorded before any status line has been seen.
pub const UNKNOWN_STATUS: &str = "000";

/// Status line plus lowercase-keyed fields of one response, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub status_code: String,
    pub status_text: String,
    fields: Vec<(String, String)>,
}

impl Default for ResponseHeaders {
    fn default() -> Self {
        Self {
            status_code: UNKNOWN_STATUS.to_string(),
            status_text: String::new(),
            fields: Vec::new(),
        }
    }
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` (lowercased); a repeated field keeps its first position and the latest value.
    pub fn insert(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.fields.push((name, value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Parsed `content-length`; missing or non-numeric values are `None`.
    pub fn content_length(&self) -> Option<u64> {
        self.get("content-length")?.trim().parse().ok()
    }

    /// Non-empty `etag` value.
    pub fn etag(&self) -> Option<&str> {
        self.get("etag").filter(|v| !v.is_empty())
    }

    /// Non-empty `last-modified` value.
    pub fn last_modified(&self) -> Option<&str> {
        self.get("last-modified").filter(|v| !v.is_empty())
    }

    pub fn is_redirect(&self) -> bool {
        REDIRECT_CODES.contains(&self.status_code.as_str())
    }

    /// `1xx` interim response (`100 Continue`, `103 Early Hints`); the real one follows.
    pub fn is_interim(&self) -> bool {
        self.status_code.len() == 3 && self.status_code.starts_with('1')
    }

    /// Another response follows this one on the same transfer.
    pub fn expects_next_response(&self) -> bool {
        self.is_redirect() || self.is_interim()
    }

    pub fn is_success(&self) -> bool {
        self.status_code.len() == 3 && self.status_code.starts_with('2')
    }

    pub fn is_not_modified(&self) -> bool {
        self.status_code == "304"
    }

    fn set_status(&mut self, code: &str, text: &str) {
        self.status_code = code.to_string();
        self.status_text = text.to_string();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    AwaitingStatusLine,
    CapturingHeaders,
    Complete,
}

/// How a fed line was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Status,
    Field,
    FtpReply,
    /// Blank line after a redirect or interim response: header set discarded, capture continues.
    HopReset,
    EndOfHeaders,
    /// Unrecognized, or arrived after capture completed.
    Ignored,
}

/// Header capture state machine for one transfer.
#[derive(Debug, Clone)]
pub struct HeaderCapture {
    headers: ResponseHeaders,
    state: CaptureState,
    ftp: bool,
}

impl HeaderCapture {
    pub fn new(ftp: bool) -> Self {
        Self {
            headers: ResponseHeaders::new(),
            state: CaptureState::AwaitingStatusLine,
            ftp,
        }
    }

    /// FTP reply reinterpretation is enabled for `ftp://` targets.
    pub fn for_url(url: &str) -> Self {
        let ftp = url
            .get(..6)
            .map(|s| s.eq_ignore_ascii_case("ftp://"))
            .unwrap_or(false);
        Self::new(ftp)
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == CaptureState::Complete
    }

    /// End capture with whatever has been seen (transfer exited early).
    pub fn force_complete(&mut self) {
        self.state = CaptureState::Complete;
    }

    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    pub fn into_headers(self) -> ResponseHeaders {
        self.headers
    }

    fn restart(&mut self) {
        self.headers = ResponseHeaders::new();
        self.state = CaptureState::AwaitingStatusLine;
    }

    /// Classify one raw line (line endings are stripped here).
    pub fn feed(&mut self, raw: &str) -> LineKind {
        if self.is_complete() {
            return LineKind::Ignored;
        }
        let line = raw.trim_end_matches(['\r', '\n']);

        if line.starts_with("HTTP/") {
            if self.headers.expects_next_response() {
                self.restart();
            }
            let mut parts = line.splitn(3, char::is_whitespace);
            let _protocol = parts.next();
            let code = parts.next().unwrap_or(UNKNOWN_STATUS);
            let text = parts.next().unwrap_or("").trim();
            self.headers.set_status(code, text);
            self.state = CaptureState::CapturingHeaders;
            return LineKind::Status;
        }

        if line.contains(": ") {
            if let Some((name, value)) = line.split_once(':') {
                self.headers.insert(name.trim(), value.trim());
            }
            self.state = CaptureState::CapturingHeaders;
            return LineKind::Field;
        }

        if self.ftp && !line.is_empty() {
            return self.feed_ftp(line);
        }

        if line.is_empty() {
            if self.headers.expects_next_response() {
                self.restart();
                return LineKind::HopReset;
            }
            self.state = CaptureState::Complete;
            return LineKind::EndOfHeaders;
        }

        LineKind::Ignored
    }

    fn feed_ftp(&mut self, line: &str) -> LineKind {
        let (code, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };
        match code {
            // Reply to SIZE: maps onto content-length.
            "213" if !rest.is_empty() => self.headers.insert("content-length", rest),
            c if c.starts_with("55") => self.headers.set_status("404", line),
            "150" | "125" => {
                self.headers.set_status("200", line);
                self.state = CaptureState::Complete;
                return LineKind::EndOfHeaders;
            }
            _ => return LineKind::Ignored,
        }
        self.state = CaptureState::CapturingHeaders;
        LineKind::FtpReply
    }
}
