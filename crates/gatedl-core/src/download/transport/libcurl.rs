//! In-process transport on a libcurl easy handle driven from a worker thread.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use curl::easy::Easy;

use super::{poll_channel, LinePoll, Transfer, TransferExit, TransferRequest, Transport};
use crate::config::GatedlConfig;
use crate::error::{GatedlError, Result};
use crate::http::{curl_error_text, header_line, header_list};

/// Exit code for failures that never reached libcurl (setup, thread panic).
const INTERNAL_FAILURE_CODE: i32 = -1;

#[derive(Debug, Clone)]
pub struct LibcurlTransport {
    pub connect_timeout: Duration,
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
}

impl LibcurlTransport {
    pub fn from_config(cfg: &GatedlConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            low_speed_limit: cfg.low_speed_limit_bytes,
            low_speed_time: cfg.low_speed_time(),
        }
    }
}

struct Job {
    url: String,
    headers: BTreeMap<String, String>,
    cookie_file: PathBuf,
    connect_timeout: Duration,
    low_speed_limit: u32,
    low_speed_time: Duration,
}

impl Transport for LibcurlTransport {
    fn start(&self, req: &TransferRequest<'_>) -> Result<Box<dyn Transfer>> {
        let out = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(req.output)
            .map_err(|e| GatedlError::storage(format!("open {}", req.output.display()), e))?;

        let job = Job {
            url: req.url.to_string(),
            headers: req.headers.clone(),
            cookie_file: req.cookie_file.to_path_buf(),
            connect_timeout: self.connect_timeout,
            low_speed_limit: self.low_speed_limit,
            low_speed_time: self.low_speed_time,
        };
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("gatedl-transfer".to_string())
            .spawn(move || run(job, out, tx))
            .map_err(|e| GatedlError::storage("spawn transfer thread", e))?;

        Ok(Box::new(LibcurlTransfer {
            lines: rx,
            worker: Some(handle),
            exit: None,
        }))
    }
}

fn run(job: Job, mut out: File, tx: Sender<String>) -> TransferExit {
    match perform(&job, &mut out, &tx) {
        Ok(()) => TransferExit::success(),
        Err(PerformError::Curl(e)) => TransferExit::failed(e.code() as i32, curl_error_text(&e)),
        Err(PerformError::Setup(e)) => TransferExit::failed(INTERNAL_FAILURE_CODE, e.to_string()),
    }
}

enum PerformError {
    Curl(curl::Error),
    Setup(GatedlError),
}

impl From<curl::Error> for PerformError {
    fn from(e: curl::Error) -> Self {
        PerformError::Curl(e)
    }
}

fn perform(job: &Job, out: &mut File, tx: &Sender<String>) -> std::result::Result<(), PerformError> {
    let mut easy = Easy::new();
    easy.url(&job.url)?;
    easy.follow_location(true)?;
    easy.fail_on_error(true)?;
    easy.cookie_file(&job.cookie_file)?;
    easy.connect_timeout(job.connect_timeout)?;
    easy.low_speed_limit(job.low_speed_limit)?;
    easy.low_speed_time(job.low_speed_time)?;
    if !job.headers.is_empty() {
        easy.http_headers(header_list(&job.headers).map_err(PerformError::Setup)?)?;
    }

    let mut write_error: Option<std::io::Error> = None;
    let result = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            let line = header_line(data);
            // Receiver gone means nobody waits for this transfer any more.
            tx.send(line).is_ok()
        })?;
        transfer.write_function(|data| match out.write_all(data) {
            Ok(()) => Ok(data.len()),
            Err(e) => {
                write_error = Some(e);
                Ok(0)
            }
        })?;
        transfer.perform()
    };
    if let Some(e) = write_error {
        tracing::warn!(url = %job.url, error = %e, "writing transfer body failed");
    }
    result.map_err(PerformError::from)
}

struct LibcurlTransfer {
    lines: Receiver<String>,
    worker: Option<JoinHandle<TransferExit>>,
    exit: Option<TransferExit>,
}

impl Transfer for LibcurlTransfer {
    fn next_line(&mut self, wait: Duration) -> LinePoll {
        poll_channel(&self.lines, wait)
    }

    fn try_exit(&mut self) -> Option<TransferExit> {
        if self.exit.is_none() && self.worker.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = self.worker.take() {
                self.exit = Some(handle.join().unwrap_or_else(|_| {
                    TransferExit::failed(INTERNAL_FAILURE_CODE, "transfer thread panicked")
                }));
            }
        }
        self.exit.clone()
    }
}
