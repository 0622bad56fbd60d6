//! Tests for the get subcommand.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

const TRACK: &str = "https://open.spotify.com/track/0DiWol3AO6WpXZgp0goxAV";

#[test]
fn cli_parse_get_defaults() {
    match parse(&["votifast", "get", TRACK]) {
        CliCommand::Get {
            url,
            download_workers,
            decrypt_workers,
            output_dir,
            session,
        } => {
            assert_eq!(url, TRACK);
            assert!(download_workers.is_none());
            assert!(decrypt_workers.is_none());
            assert!(output_dir.is_none());
            assert!(session.sp_dc.is_none());
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_overrides() {
    match parse(&[
        "votifast",
        "get",
        TRACK,
        "--download-workers",
        "4",
        "--decrypt-workers",
        "2",
        "-o",
        "/music",
        "--sp-dc",
        "cookie",
    ]) {
        CliCommand::Get {
            download_workers,
            decrypt_workers,
            output_dir,
            session,
            ..
        } => {
            assert_eq!(download_workers, Some(4));
            assert_eq!(decrypt_workers, Some(2));
            assert_eq!(output_dir.as_deref(), Some(std::path::Path::new("/music")));
            assert_eq!(session.sp_dc.as_deref(), Some("cookie"));
        }
        _ => panic!("expected Get with overrides"),
    }
}

#[test]
fn cli_parse_get_requires_url() {
    assert!(Cli::try_parse_from(["votifast", "get"]).is_err());
}

#[test]
fn cli_parse_get_rejects_non_numeric_workers() {
    assert!(Cli::try_parse_from(["votifast", "get", TRACK, "--download-workers", "many"]).is_err());
}
