//! Byte transfer for the download engine.
//!
//! A [`Transport`] starts a transfer that writes the body straight into a
//! temp file and reports header lines as they arrive; the engine polls lines
//! and exit status without blocking on either.

mod binary;
mod libcurl;
#[cfg(test)]
pub(crate) mod scripted;

pub use binary::{parse_curl_stderr, CurlBinaryTransport};
pub use libcurl::LibcurlTransport;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::error::Result;

/// One download transfer.
#[derive(Debug, Clone, Copy)]
pub struct TransferRequest<'a> {
    pub url: &'a str,
    /// Caller headers plus any conditional headers.
    pub headers: &'a BTreeMap<String, String>,
    /// Netscape cookie file sent with the request (read only).
    pub cookie_file: &'a Path,
    /// Body destination; truncated at start.
    pub output: &'a Path,
}

/// Final status of a transfer. `code` follows curl's exit codes; 0 is success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferExit {
    pub code: i32,
    pub message: String,
}

impl TransferExit {
    pub fn success() -> Self {
        Self {
            code: 0,
            message: String::new(),
        }
    }

    pub fn failed(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Result of waiting for the next header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinePoll {
    Line(String),
    /// Nothing arrived within the wait.
    Idle,
    /// The producer is gone; no more lines will come.
    Closed,
}

/// A running transfer.
pub trait Transfer: Send {
    /// Wait up to `wait` for the next header line.
    fn next_line(&mut self, wait: Duration) -> LinePoll;
    /// Exit status once the transfer has finished; `None` while running.
    fn try_exit(&mut self) -> Option<TransferExit>;
}

/// Starts transfers.
pub trait Transport: Send + Sync {
    fn start(&self, req: &TransferRequest<'_>) -> Result<Box<dyn Transfer>>;
}

/// Poll a header line channel fed by a producer thread.
pub(crate) fn poll_channel(lines: &Receiver<String>, wait: Duration) -> LinePoll {
    match lines.recv_timeout(wait) {
        Ok(line) => LinePoll::Line(line),
        Err(RecvTimeoutError::Timeout) => LinePoll::Idle,
        Err(RecvTimeoutError::Disconnected) => LinePoll::Closed,
    }
}
