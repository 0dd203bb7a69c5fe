//! Canned transfers for engine tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{LinePoll, Transfer, TransferExit, TransferRequest, Transport};
use crate::error::{GatedlError, Result};

/// One scripted response: header lines, body bytes and exit status.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    pub lines: Vec<String>,
    pub body: Vec<u8>,
    pub exit: TransferExit,
    /// Number of exit checks that report "still running" before the exit shows.
    pub busy_polls: usize,
}

impl Script {
    pub fn ok(lines: &[&str], body: &[u8]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            body: body.to_vec(),
            exit: TransferExit::success(),
            busy_polls: 0,
        }
    }

    pub fn failing(code: i32, message: &str) -> Self {
        Self {
            lines: Vec::new(),
            body: Vec::new(),
            exit: TransferExit::failed(code, message),
            busy_polls: 0,
        }
    }
}

/// Replays queued scripts in order and records the headers of each request.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedTransport {
    scripts: Arc<Mutex<Vec<Script>>>,
    pub requests: Arc<Mutex<Vec<BTreeMap<String, String>>>>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts)),
            requests: Arc::default(),
        }
    }

    pub fn recorded(&self) -> Vec<BTreeMap<String, String>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn start(&self, req: &TransferRequest<'_>) -> Result<Box<dyn Transfer>> {
        self.requests.lock().unwrap().push(req.headers.clone());
        let mut scripts = self.scripts.lock().unwrap();
        assert!(!scripts.is_empty(), "no scripted transfer left");
        let script = scripts.remove(0);
        std::fs::write(req.output, &script.body)
            .map_err(|e| GatedlError::storage("scripted body", e))?;
        Ok(Box::new(ScriptedTransfer {
            lines: script.lines,
            next: 0,
            busy_polls: script.busy_polls,
            exit: script.exit,
        }))
    }
}

struct ScriptedTransfer {
    lines: Vec<String>,
    next: usize,
    busy_polls: usize,
    exit: TransferExit,
}

impl Transfer for ScriptedTransfer {
    fn next_line(&mut self, _wait: Duration) -> LinePoll {
        match self.lines.get(self.next) {
            Some(line) => {
                self.next += 1;
                LinePoll::Line(line.clone())
            }
            None => LinePoll::Closed,
        }
    }

    fn try_exit(&mut self) -> Option<TransferExit> {
        if self.busy_polls > 0 {
            self.busy_polls -= 1;
            return None;
        }
        Some(self.exit.clone())
    }
}
