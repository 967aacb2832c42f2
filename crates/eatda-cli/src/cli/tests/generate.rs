//! Tests for the event, menu-poster and review subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_event() {
    match parse(&[
        "eatda",
        "event",
        "--store-id",
        "3",
        "--title",
        "Grand opening",
        "--start",
        "2025-09-01",
        "--end",
        "2025-09-07",
        "--prompt",
        "warm colours",
        "--image",
        "a.png",
        "--image",
        "b.jpg",
    ]) {
        CliCommand::Event {
            store_id,
            title,
            start,
            end,
            images,
            finalize,
            save,
            ..
        } => {
            assert_eq!(store_id, 3);
            assert_eq!(title, "Grand opening");
            assert_eq!(start, "2025-09-01");
            assert_eq!(end, "2025-09-07");
            assert_eq!(images, vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")]);
            assert!(finalize.is_none());
            assert!(!save);
        }
        _ => panic!("expected Event"),
    }
}

#[test]
fn cli_parse_event_finalize_and_save() {
    match parse(&[
        "eatda", "event", "--store-id", "1", "--title", "t", "--start", "s", "--end", "e",
        "--prompt", "p", "--finalize", "Half price all week", "--save",
    ]) {
        CliCommand::Event {
            images,
            finalize,
            save,
            ..
        } => {
            assert!(images.is_empty());
            assert_eq!(finalize.as_deref(), Some("Half price all week"));
            assert!(save);
        }
        _ => panic!("expected Event with --finalize --save"),
    }
}

#[test]
fn cli_parse_event_requires_title() {
    let res = Cli::try_parse_from([
        "eatda", "event", "--store-id", "1", "--start", "s", "--end", "e", "--prompt", "p",
    ]);
    assert!(res.is_err());
}

#[test]
fn cli_parse_menu_poster() {
    match parse(&[
        "eatda",
        "menu-poster",
        "--store-id",
        "2",
        "--menu-id",
        "10",
        "--menu-id",
        "11",
        "--prompt",
        "bold",
        "--image",
        "menu.webp",
    ]) {
        CliCommand::MenuPoster {
            store_id,
            menu_ids,
            images,
            finalize,
            ..
        } => {
            assert_eq!(store_id, 2);
            assert_eq!(menu_ids, vec![10, 11]);
            assert_eq!(images, vec![PathBuf::from("menu.webp")]);
            assert!(finalize.is_none());
        }
        _ => panic!("expected MenuPoster"),
    }
}

#[test]
fn cli_parse_menu_poster_requires_menu_and_image() {
    let no_menu = Cli::try_parse_from([
        "eatda", "menu-poster", "--store-id", "2", "--prompt", "p", "--image", "m.png",
    ]);
    assert!(no_menu.is_err());
    let no_image = Cli::try_parse_from([
        "eatda", "menu-poster", "--store-id", "2", "--menu-id", "1", "--prompt", "p",
    ]);
    assert!(no_image.is_err());
}

#[test]
fn cli_parse_review() {
    match parse(&[
        "eatda", "review", "--store-id", "4", "--menu-id", "2", "--menu-id", "5", "--type",
        "SHORTS_GEN_4", "--prompt", "steam rising", "--image", "plate.jpg",
    ]) {
        CliCommand::Review {
            store_id,
            menu_ids,
            asset_type,
            images,
            finalize,
            ..
        } => {
            assert_eq!(store_id, 4);
            assert_eq!(menu_ids, vec![2, 5]);
            assert_eq!(asset_type, "SHORTS_GEN_4");
            assert_eq!(images, vec![PathBuf::from("plate.jpg")]);
            assert!(finalize.is_none());
        }
        _ => panic!("expected Review"),
    }
}

#[test]
fn cli_parse_review_defaults_to_image() {
    match parse(&[
        "eatda", "review", "--store-id", "4", "--menu-id", "2", "--prompt", "p", "--image",
        "a.png",
    ]) {
        CliCommand::Review { asset_type, .. } => assert_eq!(asset_type, "IMAGE"),
        _ => panic!("expected Review"),
    }
}
