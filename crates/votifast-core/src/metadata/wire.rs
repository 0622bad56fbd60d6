//! Response shapes of the web-player APIs, reduced to the fields we read.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use super::model::{Album, AlbumTrack, CoverArt, SourceFormat, TrackStub};

/// `persistedQuery` hashes for the GraphQL endpoint.
pub const ACCOUNT_ATTRIBUTES_HASH: &str =
    "24aaa3057b69fa91492de26841ad199bd0b330ca95817b7a4d6715150de01827";
pub const GET_ALBUM_HASH: &str = "b9bfabef66ed756e5e13f68a942deb60bd4125ec1f1be8cc42769dc0259b4b10";
pub const FETCH_PLAYLIST_HASH: &str =
    "7982b11e21535cd2594badc40030b745671b61a1fa66766e569d45e6364f3422";

/// Body of a persisted GraphQL query.
pub fn persisted_query(operation: &str, hash: &str, variables: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "variables": variables,
        "operationName": operation,
        "extensions": {
            "persistedQuery": { "version": 1, "sha256Hash": hash }
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct GraphQl<T> {
    pub data: T,
}

// --- account attributes

#[derive(Debug, Deserialize)]
pub struct AccountData {
    pub me: Me,
}

#[derive(Debug, Deserialize)]
pub struct Me {
    pub account: Account,
}

#[derive(Debug, Deserialize)]
pub struct Account {
    pub product: String,
}

// --- track playback

#[derive(Debug, Deserialize)]
pub struct PlaybackInfo {
    #[serde(default)]
    pub media: Option<BTreeMap<String, PlaybackMedia>>,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackMedia {
    pub item: PlaybackItem,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackItem {
    pub manifest: Manifest,
    pub metadata: PlaybackMetadata,
}

#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub file_ids_mp4: Vec<ManifestFile>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestFile {
    pub file_id: String,
    pub format: NumberOrString,
    pub bitrate: u32,
}

/// Some fields arrive as `10` or `"10"` depending on the endpoint version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::String(s) => s.trim().parse().ok(),
        }
    }
}

impl ManifestFile {
    pub fn source_format(&self) -> Option<SourceFormat> {
        self.format.as_i64().and_then(SourceFormat::from_code)
    }
}

#[derive(Debug, Deserialize)]
pub struct PlaybackMetadata {
    pub name: String,
    #[serde(default)]
    pub authors: Vec<Named>,
    #[serde(default)]
    pub group_name: String,
    /// Milliseconds.
    pub duration: u64,
    #[serde(default)]
    pub images: Vec<Image>,
}

impl PlaybackMetadata {
    pub fn stub(&self) -> TrackStub {
        TrackStub {
            name: self.name.clone(),
            artists: self.authors.iter().map(|a| a.name.clone()).collect(),
            album: self.group_name.clone(),
            duration: Duration::from_millis(self.duration),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl From<&Image> for CoverArt {
    fn from(i: &Image) -> Self {
        CoverArt {
            url: i.url.clone(),
            width: i.width.unwrap_or(0),
            height: i.height.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageResolve {
    #[serde(default)]
    pub cdnurl: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeekTable {
    pub pssh: String,
}

// --- album / playlist

#[derive(Debug, Deserialize)]
pub struct Items<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileItem {
    pub profile: Named,
}

fn names(artists: &Items<ProfileItem>) -> Vec<String> {
    artists.items.iter().map(|a| a.profile.name.clone()).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalMilliseconds {
    pub total_milliseconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct Playability {
    #[serde(default)]
    pub playable: bool,
}

/// `spotify:track:<id>` → `<id>`.
fn id_from_uri(uri: &str) -> String {
    uri.splitn(3, ':').nth(2).unwrap_or(uri).to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumData {
    pub album_union: AlbumUnion,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumUnion {
    pub name: String,
    pub artists: Items<ProfileItem>,
    pub date: IsoDate,
    pub cover_art: CoverSources,
    pub tracks_v2: Items<AlbumTrackItem>,
    #[serde(default)]
    pub label: String,
    pub discs: TotalCount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsoDate {
    pub iso_string: String,
}

#[derive(Debug, Deserialize)]
pub struct CoverSources {
    #[serde(default)]
    pub sources: Vec<Image>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct AlbumTrackItem {
    pub track: AlbumTrackWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumTrackWire {
    pub name: String,
    pub artists: Items<ProfileItem>,
    pub duration: TotalMilliseconds,
    pub track_number: u32,
    pub disc_number: u32,
    pub playability: Playability,
    pub uri: String,
}

impl AlbumUnion {
    pub fn into_album(self) -> Album {
        let album_name = self.name.clone();
        let tracks = self
            .tracks_v2
            .items
            .into_iter()
            .map(|item| {
                let t = item.track;
                AlbumTrack {
                    stub: TrackStub {
                        artists: names(&t.artists),
                        name: t.name,
                        album: album_name.clone(),
                        duration: Duration::from_millis(t.duration.total_milliseconds),
                    },
                    number: t.track_number,
                    disc: t.disc_number,
                    playable: t.playability.playable,
                    track_id: id_from_uri(&t.uri),
                }
            })
            .collect();
        Album {
            artists: names(&self.artists),
            name: self.name,
            date: self.date.iso_string,
            covers: self.cover_art.sources.iter().map(CoverArt::from).collect(),
            tracks,
            label: self.label,
            discs: self.discs.total_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistData {
    pub playlist_v2: PlaylistV2,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistV2 {
    pub content: Items<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub item_v2: PlaylistItemData,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItemData {
    pub data: PlaylistTrackWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistTrackWire {
    pub name: String,
    pub artists: Items<ProfileItem>,
    pub album_of_track: Named,
    pub track_duration: TotalMilliseconds,
    pub track_number: u32,
    pub disc_number: u32,
    pub playability: Playability,
    pub uri: String,
}

impl PlaylistV2 {
    pub fn into_tracks(self) -> Vec<AlbumTrack> {
        self.content
            .items
            .into_iter()
            .map(|item| {
                let t = item.item_v2.data;
                AlbumTrack {
                    stub: TrackStub {
                        artists: names(&t.artists),
                        name: t.name,
                        album: t.album_of_track.name,
                        duration: Duration::from_millis(t.track_duration.total_milliseconds),
                    },
                    number: t.track_number,
                    disc: t.disc_number,
                    playable: t.playability.playable,
                    track_id: id_from_uri(&t.uri),
                }
            })
            .collect()
    }
}
