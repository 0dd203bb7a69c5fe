//! Minimal HTTP/1.1 forum for integration tests.
//!
//! `POST /login` sets a session cookie when the credentials match. The
//! download page and the files under `/files/` require that cookie. Files
//! carry an ETag and answer `If-None-Match` with 304, except `Tool-*` which
//! only sends Last-Modified. `/redirect/<name>` bounces to `/files/<name>`
//! with an ETag of its own, and `/denied/<name>` returns a tiny HTML page.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "s3cret";
pub const SESSION: &str = "wordpress_logged_in=alice%7Cabc123";
pub const ETAG: &str = "\"v1-5f2a\"";
pub const LAST_MODIFIED: &str = "Tue, 01 Oct 2024 10:00:00 GMT";

pub const PAGE: &str = r#"<html><body>
<ul class="downloads">
  <li><a href="/files/Max-1.2.dmg">Max 1.2</a></li>
  <li><a href="/redirect/Tool-3.0.zip">Tool 3.0</a></li>
  <li><a href="/denied/Locked-2.pkg">Locked</a></li>
  <li><a href="/files/Gone-0.9.tar.gz">Gone</a></li>
</ul>
</body></html>"#;

/// Running server: base URL plus counters of served file bodies and 304s.
#[derive(Debug, Clone)]
pub struct ForumServer {
    pub base: String,
    pub bodies_served: Arc<AtomicUsize>,
    pub not_modified_served: Arc<AtomicUsize>,
}

impl ForumServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn bodies(&self) -> usize {
        self.bodies_served.load(Ordering::SeqCst)
    }

    pub fn not_modified(&self) -> usize {
        self.not_modified_served.load(Ordering::SeqCst)
    }
}

/// Deterministic artifact body served for every file under `/files/`.
pub fn artifact_body() -> Vec<u8> {
    (0u8..251).cycle().take(48 * 1024).collect()
}

/// Starts the server on an ephemeral port. Runs until the process exits.
pub fn start() -> ForumServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let server = ForumServer {
        base: format!("http://127.0.0.1:{}", port),
        bodies_served: Arc::new(AtomicUsize::new(0)),
        not_modified_served: Arc::new(AtomicUsize::new(0)),
    };
    let counters = server.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let counters = counters.clone();
            thread::spawn(move || handle(stream, &counters));
        }
    });
    server
}

struct Request {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn has_session(&self) -> bool {
        self.header("cookie")
            .map(|c| c.split(';').any(|p| p.trim() == SESSION))
            .unwrap_or(false)
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let path = first.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while data.len() < header_end + content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }
    let body = String::from_utf8_lossy(&data[header_end..]).into_owned();
    Some(Request {
        method,
        path,
        headers,
        body,
    })
}

fn respond(stream: &mut TcpStream, status: &str, headers: &[(&str, String)], body: &[u8]) {
    let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
    for (k, v) in headers {
        head.push_str(&format!("{}: {}\r\n", k, v));
    }
    head.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

fn handle(mut stream: TcpStream, counters: &ForumServer) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let req = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };

    match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/login") => {
            let expected = format!("username={}&password={}", USERNAME, PASSWORD);
            if req.body.starts_with(&expected) {
                respond(
                    &mut stream,
                    "200 OK",
                    &[("Set-Cookie", format!("{}; Path=/", SESSION))],
                    b"<p>Welcome back</p>",
                );
            } else {
                respond(
                    &mut stream,
                    "200 OK",
                    &[],
                    b"<p><strong>ERROR</strong>: Incorrect username or password.</p>",
                );
            }
        }
        ("GET", "/shop/downloads") => {
            let body = if req.has_session() {
                PAGE
            } else {
                "<html><body>Please log in.</body></html>"
            };
            respond(&mut stream, "200 OK", &[], body.as_bytes());
        }
        ("GET", path) if path.starts_with("/redirect/") => {
            let target = path.replacen("/redirect/", "/files/", 1);
            respond(
                &mut stream,
                "302 Found",
                &[
                    ("Location", target),
                    ("ETag", "\"redirect-hop\"".to_string()),
                ],
                b"",
            );
        }
        ("GET", path) if path.starts_with("/denied/") => {
            let body = vec![b'.'; 312];
            respond(&mut stream, "200 OK", &[("Content-Type", "text/html".into())], &body);
        }
        ("GET", path) if path.starts_with("/files/") => {
            if !req.has_session() {
                respond(&mut stream, "403 Forbidden", &[], b"forbidden");
            } else if path.starts_with("/files/Gone") {
                respond(&mut stream, "404 Not Found", &[], b"not found");
            } else if req.header("if-none-match") == Some(ETAG) {
                counters.not_modified_served.fetch_add(1, Ordering::SeqCst);
                let _ = stream.write_all(
                    format!(
                        "HTTP/1.1 304 Not Modified\r\nConnection: close\r\nETag: {}\r\n\r\n",
                        ETAG
                    )
                    .as_bytes(),
                );
            } else {
                counters.bodies_served.fetch_add(1, Ordering::SeqCst);
                let mut headers = vec![("Last-Modified", LAST_MODIFIED.to_string())];
                if !path.starts_with("/files/Tool") {
                    headers.push(("ETag", ETAG.to_string()));
                }
                respond(&mut stream, "200 OK", &headers, &artifact_body());
            }
        }
        _ => respond(&mut stream, "404 Not Found", &[], b"not found"),
    }
}
