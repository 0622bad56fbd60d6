//! Parsing of share links into a kind and an id.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Track,
    Album,
    Playlist,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Track => "track",
            MediaKind::Album => "album",
            MediaKind::Playlist => "playlist",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaRefError {
    #[error("not a URL: {0}")]
    NotAUrl(String),
    #[error("not an open.spotify.com link: {0}")]
    WrongHost(String),
    #[error("expected /track/, /album/ or /playlist/ followed by an id: {0}")]
    UnsupportedPath(String),
}

const HOST: &str = "open.spotify.com";

impl MediaRef {
    /// Accepts `https://open.spotify.com/{track|album|playlist}/{id}`, optionally
    /// with a locale segment (`/intl-de/`) and a query string.
    pub fn parse(input: &str) -> Result<Self, MediaRefError> {
        let url = url::Url::parse(input.trim())
            .map_err(|_| MediaRefError::NotAUrl(input.to_string()))?;
        if url.host_str() != Some(HOST) {
            return Err(MediaRefError::WrongHost(input.to_string()));
        }
        let unsupported = || MediaRefError::UnsupportedPath(input.to_string());

        let mut segments = url
            .path_segments()
            .ok_or_else(unsupported)?
            .filter(|s| !s.is_empty())
            .skip_while(|s| s.starts_with("intl-"));
        let kind = match segments.next() {
            Some("track") => MediaKind::Track,
            Some("album") => MediaKind::Album,
            Some("playlist") => MediaKind::Playlist,
            _ => return Err(unsupported()),
        };
        let id = segments.next().ok_or_else(unsupported)?;
        if segments.next().is_some() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(unsupported());
        }
        Ok(MediaRef {
            kind,
            id: id.to_string(),
        })
    }
}

impl FromStr for MediaRef {
    type Err = MediaRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaRef::parse(s)
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{HOST}/{}/{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_kind() {
        let t = MediaRef::parse("https://open.spotify.com/track/0DiWol3AO6WpXZgp0goxAV").unwrap();
        assert_eq!(t.kind, MediaKind::Track);
        assert_eq!(t.id, "0DiWol3AO6WpXZgp0goxAV");
        let a = MediaRef::parse("https://open.spotify.com/album/2noRn2Aes5aoNVsU6iWThc").unwrap();
        assert_eq!(a.kind, MediaKind::Album);
        let p: MediaRef = "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M"
            .parse()
            .unwrap();
        assert_eq!(p.kind, MediaKind::Playlist);
    }

    #[test]
    fn ignores_locale_and_query() {
        let t = MediaRef::parse("https://open.spotify.com/intl-de/track/abc123?si=xyz").unwrap();
        assert_eq!(t, MediaRef { kind: MediaKind::Track, id: "abc123".to_string() });
    }

    #[test]
    fn rejects_other_links() {
        assert!(matches!(
            MediaRef::parse("https://example.com/track/abc"),
            Err(MediaRefError::WrongHost(_))
        ));
        assert!(matches!(
            MediaRef::parse("https://open.spotify.com/artist/abc"),
            Err(MediaRefError::UnsupportedPath(_))
        ));
        assert!(matches!(
            MediaRef::parse("https://open.spotify.com/track/"),
            Err(MediaRefError::UnsupportedPath(_))
        ));
        assert!(matches!(MediaRef::parse("track abc"), Err(MediaRefError::NotAUrl(_))));
    }

    #[test]
    fn display_round_trips_to_canonical_link() {
        let t = MediaRef::parse("https://open.spotify.com/intl-fr/album/xyz?si=1").unwrap();
        assert_eq!(t.to_string(), "https://open.spotify.com/album/xyz");
    }
}
