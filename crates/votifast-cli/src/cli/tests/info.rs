//! Tests for the info subcommand.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_info() {
    match parse(&["votifast", "info", "https://open.spotify.com/album/abc"]) {
        CliCommand::Info { url, session } => {
            assert_eq!(url, "https://open.spotify.com/album/abc");
            assert!(session.sp_dc.is_none());
        }
        _ => panic!("expected Info"),
    }
}

#[test]
fn cli_parse_info_with_cookie() {
    match parse(&["votifast", "info", "https://open.spotify.com/playlist/p", "--sp-dc", "x"]) {
        CliCommand::Info { session, .. } => assert_eq!(session.sp_dc.as_deref(), Some("x")),
        _ => panic!("expected Info"),
    }
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["votifast", "status"]).is_err());
}
