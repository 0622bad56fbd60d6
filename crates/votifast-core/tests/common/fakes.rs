//! In-memory catalog and decrypt tool for pipeline tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use votifast_core::error::{DecryptionError, MetadataError};
use votifast_core::license::{ContentKey, KeyKind};
use votifast_core::metadata::{
    Album, AlbumTrack, MediaCatalog, SourceFormat, Track, TrackSource, TrackStub,
};
use votifast_core::worker::DecryptTool;

pub const CONTENT_KEY: [u8; 16] = [0xab; 16];

pub fn stub(artist: &str, title: &str) -> TrackStub {
    TrackStub {
        name: title.to_string(),
        artists: vec![artist.to_string()],
        album: "Album".to_string(),
        duration: Duration::from_secs(180),
    }
}

/// A track with one FREE source served by `cdns`.
pub fn track(artist: &str, title: &str, file_id: &str, cdns: Vec<String>) -> Track {
    Track {
        stub: stub(artist, title),
        covers: Vec::new(),
        sources: vec![TrackSource {
            file_id: file_id.to_string(),
            format: SourceFormat::Free,
            bitrate: 160_000,
            cdns,
        }],
    }
}

pub fn listing(track_id: &str, number: u32, playable: bool) -> AlbumTrack {
    AlbumTrack {
        stub: stub("Artist", &format!("Song {number}")),
        number,
        disc: 1,
        playable,
        track_id: track_id.to_string(),
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    tracks: Mutex<HashMap<String, Track>>,
    album: Mutex<Option<Album>>,
    key_requests: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn with_track(self, id: &str, track: Track) -> Self {
        self.tracks.lock().unwrap().insert(id.to_string(), track);
        self
    }

    pub fn with_album(self, album: Album) -> Self {
        *self.album.lock().unwrap() = Some(album);
        self
    }

    /// File ids whose key was requested, in order.
    pub fn key_requests(&self) -> Vec<String> {
        self.key_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaCatalog for FakeCatalog {
    async fn get_track(&self, id: &str) -> Result<Option<Track>, MetadataError> {
        Ok(self.tracks.lock().unwrap().get(id).cloned())
    }

    async fn get_album(&self, _id: &str) -> Result<Album, MetadataError> {
        self.album
            .lock()
            .unwrap()
            .clone()
            .ok_or(MetadataError::Status {
                context: "album".to_string(),
                status: 404,
            })
    }

    async fn get_playlist(&self, _id: &str) -> Result<Vec<AlbumTrack>, MetadataError> {
        Ok(Vec::new())
    }

    async fn get_decryption_key(&self, file_id: &str) -> Result<ContentKey, MetadataError> {
        self.key_requests.lock().unwrap().push(file_id.to_string());
        Ok(ContentKey {
            kid: "00".to_string(),
            key: CONTENT_KEY.to_vec(),
            kind: KeyKind::Content,
        })
    }
}

/// "Decrypts" by copying input to output; can be told to fail instead.
#[derive(Default)]
pub struct CopyTool {
    pub fail: bool,
    calls: Mutex<Vec<(String, PathBuf, PathBuf)>>,
}

impl CopyTool {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, PathBuf, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecryptTool for CopyTool {
    async fn decrypt(
        &self,
        key_hex: &str,
        input: &Path,
        output: &Path,
    ) -> Result<(), DecryptionError> {
        self.calls.lock().unwrap().push((
            key_hex.to_string(),
            input.to_path_buf(),
            output.to_path_buf(),
        ));
        if self.fail {
            return Err(DecryptionError::Tool {
                code: Some(1),
                stderr: "invalid key".to_string(),
            });
        }
        tokio::fs::copy(input, output)
            .await
            .map(|_| ())
            .map_err(|e| DecryptionError::Spawn(e.to_string()))
    }
}

/// Copies like [`CopyTool`], but an input whose path contains `held` waits
/// for [`GatedTool::release`] first.
pub struct GatedTool {
    inner: CopyTool,
    held: String,
    gate: Notify,
}

impl GatedTool {
    pub fn holding(held: &str) -> Self {
        Self {
            inner: CopyTool::default(),
            held: held.to_string(),
            gate: Notify::new(),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl DecryptTool for GatedTool {
    async fn decrypt(
        &self,
        key_hex: &str,
        input: &Path,
        output: &Path,
    ) -> Result<(), DecryptionError> {
        if input.to_string_lossy().contains(&self.held) {
            self.gate.notified().await;
        }
        self.inner.decrypt(key_hex, input, output).await
    }
}
