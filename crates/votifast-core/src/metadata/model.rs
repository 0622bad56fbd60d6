//! Catalog types handed to the pipeline and the CLI.

use std::time::Duration;

/// Fields shared by full tracks and album/playlist listings.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackStub {
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub duration: Duration,
}

impl TrackStub {
    /// `A`, `A & B`, or `A, B & C`.
    pub fn artist_line(&self) -> String {
        match self.artists.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            [first, second] => format!("{first} & {second}"),
            [rest @ .., last] => format!("{} & {}", rest.join(", "), last),
        }
    }
}

/// Quality tier of an audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Free = 10,
    Premium = 11,
}

impl SourceFormat {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            10 => Some(SourceFormat::Free),
            11 => Some(SourceFormat::Premium),
            _ => None,
        }
    }
}

/// One encoded rendition of a track and the CDN URLs serving it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSource {
    pub file_id: String,
    pub format: SourceFormat,
    pub bitrate: u32,
    pub cdns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl CoverArt {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

fn largest_cover(covers: &[CoverArt]) -> Option<&CoverArt> {
    covers.iter().max_by_key(|c| c.area())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub stub: TrackStub,
    pub covers: Vec<CoverArt>,
    pub sources: Vec<TrackSource>,
}

impl Track {
    /// Highest-bitrate source the account may use: FREE always, PREMIUM only
    /// when `allow_premium`.
    pub fn best_source(&self, allow_premium: bool) -> Option<&TrackSource> {
        self.sources
            .iter()
            .filter(|s| match s.format {
                SourceFormat::Free => true,
                SourceFormat::Premium => allow_premium,
            })
            .max_by_key(|s| s.bitrate)
    }

    pub fn best_cover(&self) -> Option<&CoverArt> {
        largest_cover(&self.covers)
    }
}

/// A track as listed by an album or playlist; sources need a `get_track`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumTrack {
    pub stub: TrackStub,
    pub number: u32,
    pub disc: u32,
    pub playable: bool,
    pub track_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub name: String,
    pub artists: Vec<String>,
    /// ISO-8601 release date as published.
    pub date: String,
    pub covers: Vec<CoverArt>,
    pub tracks: Vec<AlbumTrack>,
    pub label: String,
    pub discs: u32,
}

impl Album {
    pub fn best_cover(&self) -> Option<&CoverArt> {
        largest_cover(&self.covers)
    }
}
