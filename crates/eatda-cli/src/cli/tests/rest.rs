//! Tests for wait, resolve and save.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_wait_event() {
    match parse(&["eatda", "wait", "42"]) {
        CliCommand::Wait {
            asset_id,
            menu,
            review,
        } => {
            assert_eq!(asset_id, 42);
            assert!(!menu);
            assert!(!review);
        }
        _ => panic!("expected Wait"),
    }
}

#[test]
fn cli_parse_wait_menu() {
    match parse(&["eatda", "wait", "7", "--menu"]) {
        CliCommand::Wait { asset_id, menu, .. } => {
            assert_eq!(asset_id, 7);
            assert!(menu);
        }
        _ => panic!("expected Wait --menu"),
    }
}

#[test]
fn cli_parse_wait_review() {
    match parse(&["eatda", "wait", "21", "--review"]) {
        CliCommand::Wait { review, menu, .. } => {
            assert!(review);
            assert!(!menu);
        }
        _ => panic!("expected Wait --review"),
    }
    assert!(Cli::try_parse_from(["eatda", "wait", "21", "--review", "--menu"]).is_err());
}

#[test]
fn cli_parse_wait_rejects_non_numeric() {
    assert!(Cli::try_parse_from(["eatda", "wait", "abc"]).is_err());
}

#[test]
fn cli_parse_resolve() {
    match parse(&["eatda", "resolve", "5"]) {
        CliCommand::Resolve { menu_poster_id } => assert_eq!(menu_poster_id, 5),
        _ => panic!("expected Resolve"),
    }
}

#[test]
fn cli_parse_save() {
    match parse(&["eatda", "save", "9"]) {
        CliCommand::Save {
            event_asset_id,
            url,
            cached,
        } => {
            assert_eq!(event_asset_id, 9);
            assert!(url.is_none());
            assert!(cached.is_none());
        }
        _ => panic!("expected Save"),
    }
}

#[test]
fn cli_parse_save_with_sources() {
    match parse(&[
        "eatda",
        "save",
        "9",
        "--url",
        "https://cdn.example.com/p.webp?sig=1",
        "--cached",
        "/tmp/event-poster-9.webp",
    ]) {
        CliCommand::Save { url, cached, .. } => {
            assert_eq!(url.as_deref(), Some("https://cdn.example.com/p.webp?sig=1"));
            assert_eq!(
                cached.as_deref(),
                Some(std::path::Path::new("/tmp/event-poster-9.webp"))
            );
        }
        _ => panic!("expected Save with sources"),
    }
}
