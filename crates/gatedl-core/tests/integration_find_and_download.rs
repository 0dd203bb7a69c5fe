//! Integration test: login → page match → conditional download against a local forum.
//!
//! Uses the in-process libcurl transport and sidecar metadata so the test does
//! not depend on extended attribute support of the temp filesystem.

mod common;

use common::forum_server::{self, ForumServer};
use gatedl_core::config::{GatedlConfig, MetadataBackend, Recipe};
use gatedl_core::error::GatedlError;
use gatedl_core::pipeline;
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::{tempdir, TempDir};

struct Env {
    server: ForumServer,
    downloads: TempDir,
    cookies: TempDir,
    cfg: GatedlConfig,
}

fn env() -> Env {
    let cookies = tempdir().unwrap();
    let cfg = GatedlConfig {
        metadata_backend: MetadataBackend::Sidecar,
        cookie_dir: Some(cookies.path().to_path_buf()),
        poll_interval_ms: 10,
        connect_timeout_secs: 5,
        ..GatedlConfig::default()
    };
    Env {
        server: forum_server::start(),
        downloads: tempdir().unwrap(),
        cookies,
        cfg,
    }
}

fn recipe(env: &Env, pattern: &str) -> Recipe {
    Recipe {
        username: forum_server::USERNAME.to_string(),
        password: forum_server::PASSWORD.to_string(),
        login_url: env.server.url("/login"),
        url: env.server.url("/shop/downloads"),
        re_pattern: pattern.to_string(),
        re_flags: vec!["IGNORECASE".to_string()],
        result_output_var_name: "match".to_string(),
        request_headers: BTreeMap::new(),
        download_dir: Some(env.downloads.path().to_path_buf()),
        filename: None,
        check_filesize_only: false,
        pkg: None,
        curl_path: None,
        cookie_input: None,
    }
}

fn cookie_dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[test]
fn downloads_once_then_reports_unchanged() {
    let env = env();
    let r = recipe(&env, r#"href="(?P<match>/files/Max-[\d.]+\.dmg)""#);

    let first = pipeline::find_and_download(&r, &env.cfg).expect("first run");
    let artifact = env.downloads.path().join("Max-1.2.dmg");
    assert_eq!(first.pathname, artifact);
    assert!(first.download_changed);
    assert_eq!(first.etag.as_deref(), Some(forum_server::ETAG));
    assert_eq!(
        first.last_modified.as_deref(),
        Some("Tue, 01 Oct 2024 10:00:00 GMT")
    );
    assert_eq!(
        first.matched.get("match"),
        Some(&Some("/files/Max-1.2.dmg".to_string()))
    );
    assert!(first.summary.is_some());
    assert_eq!(std::fs::read(&artifact).unwrap(), forum_server::artifact_body());
    assert!(cookie_dir_is_empty(env.cookies.path()), "cookie store removed");

    let second = pipeline::find_and_download(&r, &env.cfg).expect("second run");
    assert!(!second.download_changed);
    assert!(second.summary.is_none());
    assert_eq!(second.etag.as_deref(), Some(forum_server::ETAG));
    assert_eq!(env.server.bodies(), 1);
    assert_eq!(env.server.not_modified(), 1);
    assert_eq!(std::fs::read(&artifact).unwrap(), forum_server::artifact_body());
}

#[test]
fn wrong_password_is_authentication_error() {
    let env = env();
    let mut r = recipe(&env, r#"href="(/files/Max[^"]+)""#);
    r.password = "wrong".to_string();

    match pipeline::find_and_download(&r, &env.cfg) {
        Err(GatedlError::Authentication { user }) => assert_eq!(user, "alice"),
        other => panic!("expected authentication error, got {:?}", other),
    }
    assert!(cookie_dir_is_empty(env.cookies.path()));
    assert!(std::fs::read_dir(env.downloads.path()).unwrap().next().is_none());
}

#[test]
fn login_only_succeeds() {
    let env = env();
    let r = recipe(&env, "unused");
    let info = pipeline::login(&r, &env.cfg).expect("login");
    assert_eq!(info.token_len, "wordpress_logged_in=alice%7Cabc123; Path=/".len());
    assert_eq!(info.cookie_lines, 1);
    assert!(cookie_dir_is_empty(env.cookies.path()));
}

#[test]
fn find_resolves_relative_link() {
    let env = env();
    let r = recipe(&env, r#"href="(/redirect/[^"]+)""#);
    let resolution = pipeline::find(&r, &env.cfg).expect("find");
    assert_eq!(
        resolution.target.url,
        env.server.url("/redirect/Tool-3.0.zip")
    );
    assert_eq!(env.server.bodies(), 0);
}

#[test]
fn pattern_without_match_is_no_match() {
    let env = env();
    let r = recipe(&env, r#"href="([^"]+\.msi)""#);
    match pipeline::find_and_download(&r, &env.cfg) {
        Err(GatedlError::NoMatch { url }) => assert!(url.ends_with("/shop/downloads")),
        other => panic!("expected no match, got {:?}", other),
    }
}

#[test]
fn redirect_hop_etag_not_stored() {
    let env = env();
    let r = recipe(&env, r#"href="(/redirect/Tool[^"]+)""#);
    let out = pipeline::find_and_download(&r, &env.cfg).expect("run");
    assert!(out.download_changed);
    assert_eq!(out.pathname, env.downloads.path().join("Tool-3.0.zip"));
    assert_eq!(out.etag, None);
    assert_eq!(out.last_modified.as_deref(), Some(forum_server::LAST_MODIFIED));
}

#[test]
fn tiny_body_is_entitlement_error() {
    let env = env();
    let r = recipe(&env, r#"href="(/denied/[^"]+)""#);
    match pipeline::find_and_download(&r, &env.cfg) {
        Err(GatedlError::Entitlement { content_length, .. }) => assert_eq!(content_length, 312),
        other => panic!("expected entitlement error, got {:?}", other),
    }
    assert!(std::fs::read_dir(env.downloads.path()).unwrap().next().is_none());
    assert!(cookie_dir_is_empty(env.cookies.path()));
}

#[test]
fn http_error_is_transport_failure() {
    let env = env();
    let r = recipe(&env, r#"href="(/files/Gone[^"]+)""#);
    match pipeline::find_and_download(&r, &env.cfg) {
        Err(GatedlError::Transport { code, .. }) => assert_eq!(code, 22),
        other => panic!("expected transport error, got {:?}", other),
    }
    assert!(std::fs::read_dir(env.downloads.path()).unwrap().next().is_none());
}

#[test]
fn local_override_skips_download() {
    let env = env();
    let mut r = recipe(&env, r#"href="(/files/Max[^"]+)""#);
    let local = env.downloads.path().join("provided.dmg");
    r.pkg = Some(local.clone());
    let out = pipeline::find_and_download(&r, &env.cfg).expect("run");
    assert!(out.download_changed);
    assert_eq!(out.pathname, local);
    assert_eq!(env.server.bodies(), 0);
}
