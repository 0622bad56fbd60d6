//! `votifast info` – print what a link refers to.

use anyhow::{Context, Result};
use votifast_core::config::VotifastConfig;
use votifast_core::media_ref::{MediaKind, MediaRef};
use votifast_core::metadata::{AlbumTrack, MediaCatalog};

use super::session::connect;
use crate::cli::SessionArgs;

fn mmss(d: std::time::Duration) -> String {
    let s = d.as_secs();
    format!("{}:{:02}", s / 60, s % 60)
}

fn print_listing(tracks: &[AlbumTrack]) {
    println!("{:<4} {:<4} {:<6} {:<24} {}", "DISC", "#", "TIME", "ID", "TITLE");
    for t in tracks {
        let flag = if t.playable { "" } else { "  (unplayable)" };
        println!(
            "{:<4} {:<4} {:<6} {:<24} {} - {}{}",
            t.disc,
            t.number,
            mmss(t.stub.duration),
            t.track_id,
            t.stub.artist_line(),
            t.stub.name,
            flag
        );
    }
}

pub async fn run_info(cfg: &VotifastConfig, session: &SessionArgs, url: &str) -> Result<()> {
    let media = MediaRef::parse(url)?;
    let catalog = connect(cfg, session).await?;
    println!("account: {}", if catalog.is_premium() { "premium" } else { "free" });

    match media.kind {
        MediaKind::Track => {
            let track = catalog
                .get_track(&media.id)
                .await?
                .with_context(|| format!("track {} is not available", media.id))?;
            println!("{} - {}", track.stub.artist_line(), track.stub.name);
            println!("album:    {}", track.stub.album);
            println!("duration: {}", mmss(track.stub.duration));
            if let Some(cover) = track.best_cover() {
                println!("cover:    {} ({}x{})", cover.url, cover.width, cover.height);
            }
            for s in &track.sources {
                println!(
                    "source:   {} {:?} {} kbit/s, {} CDN URL(s)",
                    s.file_id,
                    s.format,
                    s.bitrate / 1000,
                    s.cdns.len()
                );
            }
        }
        MediaKind::Album => {
            let album = catalog.get_album(&media.id).await?;
            println!("{} - {}", album.artists.join(", "), album.name);
            println!("released: {}  label: {}  discs: {}", album.date, album.label, album.discs);
            print_listing(&album.tracks);
        }
        MediaKind::Playlist => {
            let tracks = catalog.get_playlist(&media.id).await?;
            println!("{} track(s)", tracks.len());
            print_listing(&tracks);
        }
    }
    Ok(())
}
