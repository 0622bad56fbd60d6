//! CLI for the votifast downloader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use votifast_core::config::{self, VotifastConfig};

use commands::{run_get, run_info};

/// Top-level CLI for votifast.
#[derive(Debug, Parser)]
#[command(name = "votifast")]
#[command(about = "votifast: download and decrypt tracks, albums and playlists", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Login options shared by every command that talks to the service.
#[derive(Debug, Clone, Default, Args)]
pub struct SessionArgs {
    /// `sp_dc` cookie of a logged-in web session (overrides the config file).
    #[arg(long, value_name = "COOKIE")]
    pub sp_dc: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download and decrypt a track, album or playlist.
    Get {
        /// open.spotify.com link to a track, album or playlist.
        url: String,

        /// Concurrent downloads (config: download_workers).
        #[arg(long, value_name = "N")]
        download_workers: Option<usize>,

        /// Concurrent decrypt processes (config: decrypt_workers).
        #[arg(long, value_name = "N")]
        decrypt_workers: Option<usize>,

        /// Directory for the decrypted files (config: output_dir).
        #[arg(long, short = 'o', value_name = "DIR")]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Print metadata for a track, album or playlist without downloading.
    Info {
        /// open.spotify.com link to a track, album or playlist.
        url: String,

        #[command(flatten)]
        session: SessionArgs,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", redacted(&cfg));

        match cli.command {
            CliCommand::Get {
                url,
                download_workers,
                decrypt_workers,
                output_dir,
                session,
            } => {
                let mut cfg = cfg;
                if let Some(n) = download_workers {
                    cfg.download_workers = n;
                }
                if let Some(n) = decrypt_workers {
                    cfg.decrypt_workers = n;
                }
                if let Some(dir) = output_dir {
                    cfg.output_dir = dir;
                }
                run_get(&cfg, &session, &url).await?
            }
            CliCommand::Info { url, session } => run_info(&cfg, &session, &url).await?,
        }

        Ok(())
    }
}

/// Config with the login cookie masked, for logging.
fn redacted(cfg: &VotifastConfig) -> VotifastConfig {
    let mut cfg = cfg.clone();
    if cfg.sp_dc.is_some() {
        cfg.sp_dc = Some("<redacted>".to_string());
    }
    cfg
}

#[cfg(test)]
mod tests;
