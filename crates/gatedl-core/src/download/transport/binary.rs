//! Transport that runs an external `curl` executable.
//!
//! Headers are dumped to stdout (`--dump-header -`) and the body goes to the
//! temp file, so stdout carries nothing but header lines.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{poll_channel, LinePoll, Transfer, TransferExit, TransferRequest, Transport};
use crate::config::GatedlConfig;
use crate::error::{GatedlError, Result};
use crate::http::header_line;

/// Exit code reported when the child could not be waited on or was killed by a signal.
const UNKNOWN_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone)]
pub struct CurlBinaryTransport {
    pub curl_path: PathBuf,
    pub connect_timeout: Duration,
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
}

impl CurlBinaryTransport {
    pub fn from_config(cfg: &GatedlConfig, curl_path: Option<PathBuf>) -> Self {
        Self {
            curl_path: curl_path.unwrap_or_else(|| cfg.curl_path.clone()),
            connect_timeout: cfg.connect_timeout(),
            low_speed_limit: cfg.low_speed_limit_bytes,
            low_speed_time: cfg.low_speed_time(),
        }
    }

    /// Command line for one transfer (without the executable).
    pub fn arguments(&self, req: &TransferRequest<'_>) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--silent".into(),
            "--show-error".into(),
            "--no-buffer".into(),
            "--fail".into(),
            "--dump-header".into(),
            "-".into(),
            "--speed-time".into(),
            self.low_speed_time.as_secs().to_string(),
            "--speed-limit".into(),
            self.low_speed_limit.to_string(),
            "--connect-timeout".into(),
            self.connect_timeout.as_secs().to_string(),
            "--location".into(),
            "--cookie".into(),
            req.cookie_file.display().to_string(),
            "--url".into(),
            req.url.to_string(),
            "--output".into(),
            req.output.display().to_string(),
        ];
        for (name, value) in req.headers {
            args.push("--header".into());
            args.push(format!("{}: {}", name.trim(), value.trim()));
        }
        args
    }
}

impl Transport for CurlBinaryTransport {
    fn start(&self, req: &TransferRequest<'_>) -> Result<Box<dyn Transfer>> {
        let args = self.arguments(req);
        tracing::debug!(curl = %self.curl_path.display(), ?args, "spawning curl");
        let mut child = Command::new(&self.curl_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GatedlError::Transport {
                code: UNKNOWN_EXIT_CODE,
                message: format!("can't run {}: {}", self.curl_path.display(), e),
            })?;

        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            thread::spawn(move || {
                let mut reader = BufReader::new(stdout);
                let mut buf = Vec::new();
                loop {
                    buf.clear();
                    match reader.read_until(b'\n', &mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            if tx.send(header_line(&buf)).is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
        let stderr = child.stderr.take().map(|mut err| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = err.read_to_string(&mut text);
                text
            })
        });

        Ok(Box::new(CurlProcess {
            child,
            lines: rx,
            stderr,
            exit: None,
        }))
    }
}

struct CurlProcess {
    child: Child,
    lines: Receiver<String>,
    stderr: Option<JoinHandle<String>>,
    exit: Option<TransferExit>,
}

impl CurlProcess {
    fn stderr_text(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    }
}

impl Transfer for CurlProcess {
    fn next_line(&mut self, wait: Duration) -> LinePoll {
        poll_channel(&self.lines, wait)
    }

    fn try_exit(&mut self) -> Option<TransferExit> {
        if self.exit.is_some() {
            return self.exit.clone();
        }
        let exit = match self.child.try_wait() {
            Ok(None) => return None,
            Ok(Some(status)) => {
                let code = status.code().unwrap_or(UNKNOWN_EXIT_CODE);
                if code == 0 {
                    TransferExit::success()
                } else {
                    TransferExit::failed(code, parse_curl_stderr(&self.stderr_text()))
                }
            }
            Err(e) => TransferExit::failed(UNKNOWN_EXIT_CODE, format!("waiting for curl: {}", e)),
        };
        self.exit = Some(exit);
        self.exit.clone()
    }
}

impl Drop for CurlProcess {
    fn drop(&mut self) {
        if self.exit.is_none() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Message part of curl's `curl: (22) The requested URL returned error: 404`.
pub fn parse_curl_stderr(stderr: &str) -> String {
    let text = stderr.trim();
    // Last reported error wins when curl printed several lines.
    let last = text.lines().last().unwrap_or("").trim();
    let mut parts = last.splitn(3, char::is_whitespace);
    match (parts.next(), parts.next(), parts.next()) {
        (Some("curl:"), Some(code), Some(msg)) if code.starts_with('(') => msg.trim().to_string(),
        _ => last.to_string(),
    }
}
