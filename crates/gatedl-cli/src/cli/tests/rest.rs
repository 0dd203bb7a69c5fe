//! Tests for login, find and meta subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_login() {
    match parse(&["gatedl", "login", "forum.toml"]) {
        CliCommand::Login { recipe } => assert_eq!(recipe, Path::new("forum.toml")),
        _ => panic!("expected Login"),
    }
}

#[test]
fn cli_parse_find() {
    match parse(&["gatedl", "find", "forum.toml"]) {
        CliCommand::Find { recipe } => assert_eq!(recipe, Path::new("forum.toml")),
        _ => panic!("expected Find"),
    }
}

#[test]
fn cli_parse_meta() {
    match parse(&["gatedl", "meta", "/srv/dl/Max.dmg"]) {
        CliCommand::Meta { path } => assert_eq!(path, Path::new("/srv/dl/Max.dmg")),
        _ => panic!("expected Meta"),
    }
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["gatedl", "status"]).is_err());
}
