//! Catalog lookups and license-key resolution on top of the session.
//!
//! The pipeline depends on the [`MediaCatalog`] trait only; [`MetadataClient`]
//! is the implementation that talks to the real service. Every request goes
//! through [`SessionManager::send_authenticated`], so an expired credential is
//! refreshed before headers are composed.

pub mod model;
mod wire;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::MetadataError;
use crate::http::HttpRequest;
use crate::license::{ContentKey, LicenseService};
use crate::session::SessionManager;

pub use model::{Album, AlbumTrack, CoverArt, SourceFormat, Track, TrackSource, TrackStub};

/// What the pipeline needs from the catalog.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Full track with resolved sources; `None` if the service has no media for it.
    async fn get_track(&self, id: &str) -> Result<Option<Track>, MetadataError>;
    async fn get_album(&self, id: &str) -> Result<Album, MetadataError>;
    async fn get_playlist(&self, id: &str) -> Result<Vec<AlbumTrack>, MetadataError>;
    /// The CONTENT key for an audio file.
    async fn get_decryption_key(&self, file_id: &str) -> Result<ContentKey, MetadataError>;
}

pub struct MetadataClient {
    session: SessionManager,
    license: Arc<dyn LicenseService>,
    premium: OnceLock<bool>,
}

impl MetadataClient {
    pub fn new(session: SessionManager, license: Arc<dyn LicenseService>) -> Self {
        Self {
            session,
            license,
            premium: OnceLock::new(),
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Authenticates and loads the account tier. Returns whether the account is premium.
    pub async fn initialize(&self) -> Result<bool, MetadataError> {
        self.session.ensure_authenticated().await?;
        let body = wire::persisted_query("accountAttributes", wire::ACCOUNT_ATTRIBUTES_HASH, json!({}));
        let request = HttpRequest::post_json(&self.session.endpoints().metadata, &body);
        let attrs: wire::GraphQl<wire::AccountData> =
            self.fetch_json("account attributes", request).await?;
        let premium = attrs.data.me.account.product.eq_ignore_ascii_case("premium");
        let _ = self.premium.set(premium);
        tracing::info!(premium, "account attributes loaded");
        Ok(premium)
    }

    /// False until `initialize` has run.
    pub fn is_premium(&self) -> bool {
        self.premium.get().copied().unwrap_or(false)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        context: &str,
        request: HttpRequest,
    ) -> Result<T, MetadataError> {
        let response = self.session.send_authenticated(context, request).await?;
        if !response.is_success() {
            return Err(MetadataError::Status {
                context: context.to_string(),
                status: response.status,
            });
        }
        response.json().map_err(|e| MetadataError::Json {
            context: context.to_string(),
            message: e.to_string(),
        })
    }

    async fn resolve_cdns(&self, file_id: &str) -> Result<Vec<String>, MetadataError> {
        let url = self.session.endpoints().storage_resolve_url(file_id);
        let resolved: wire::StorageResolve = self
            .fetch_json("storage resolve", HttpRequest::get(url))
            .await?;
        Ok(resolved.cdnurl)
    }

    async fn exchange_license(
        &self,
        session: &crate::license::LicenseSession,
        pssh: &str,
    ) -> Result<Vec<ContentKey>, MetadataError> {
        let challenge = self.license.challenge(session, pssh).await?;
        let request = HttpRequest::post(&self.session.endpoints().widevine_license, challenge);
        let response = self.session.send_authenticated("license", request).await?;
        if !response.is_success() {
            return Err(MetadataError::Status {
                context: "license".to_string(),
                status: response.status,
            });
        }
        self.license.parse_license(session, &response.body).await
    }
}

#[async_trait]
impl MediaCatalog for MetadataClient {
    async fn get_track(&self, id: &str) -> Result<Option<Track>, MetadataError> {
        let url = self.session.endpoints().track_playback_url(id);
        let request = HttpRequest::get(url).query("manifestFileFormat", "file_ids_mp4");
        let info: wire::PlaybackInfo = self.fetch_json("track playback", request).await?;

        let Some(mut media) = info.media.filter(|m| !m.is_empty()) else {
            tracing::debug!(track = id, "no media for track");
            return Ok(None);
        };
        let key = format!("spotify:track:{id}");
        let item = media
            .remove(&key)
            .ok_or_else(|| MetadataError::MissingField {
                context: "track playback".to_string(),
                field: format!("media.{key}"),
            })?
            .item;

        let mut sources = Vec::with_capacity(item.manifest.file_ids_mp4.len());
        for file in &item.manifest.file_ids_mp4 {
            let format = file
                .source_format()
                .ok_or_else(|| MetadataError::MissingField {
                    context: "track playback".to_string(),
                    field: format!("format of {}", file.file_id),
                })?;
            let cdns = self.resolve_cdns(&file.file_id).await?;
            sources.push(TrackSource {
                file_id: file.file_id.clone(),
                format,
                bitrate: file.bitrate,
                cdns,
            });
        }

        Ok(Some(Track {
            stub: item.metadata.stub(),
            covers: item.metadata.images.iter().map(CoverArt::from).collect(),
            sources,
        }))
    }

    async fn get_album(&self, id: &str) -> Result<Album, MetadataError> {
        let body = wire::persisted_query(
            "getAlbum",
            wire::GET_ALBUM_HASH,
            json!({
                "uri": format!("spotify:album:{id}"),
                "offset": 0,
                "locale": "",
                "limit": 5000,
            }),
        );
        let request = HttpRequest::post_json(&self.session.endpoints().metadata, &body);
        let album: wire::GraphQl<wire::AlbumData> = self.fetch_json("album", request).await?;
        Ok(album.data.album_union.into_album())
    }

    async fn get_playlist(&self, id: &str) -> Result<Vec<AlbumTrack>, MetadataError> {
        let body = wire::persisted_query(
            "fetchPlaylistContents",
            wire::FETCH_PLAYLIST_HASH,
            json!({
                "uri": format!("spotify:playlist:{id}"),
                "offset": 0,
                "limit": 5000,
            }),
        );
        let request = HttpRequest::post_json(&self.session.endpoints().metadata, &body);
        let playlist: wire::GraphQl<wire::PlaylistData> =
            self.fetch_json("playlist", request).await?;
        Ok(playlist.data.playlist_v2.into_tracks())
    }

    async fn get_decryption_key(&self, file_id: &str) -> Result<ContentKey, MetadataError> {
        let url = self.session.endpoints().seek_table_url(file_id);
        let seek: wire::SeekTable = self.fetch_json("seek table", HttpRequest::get(url)).await?;

        let session = self.license.open().await?;
        let exchanged = self.exchange_license(&session, &seek.pssh).await;
        if let Err(e) = self.license.close(session).await {
            tracing::warn!("closing license session: {}", e);
        }

        let key = ContentKey::find_content(exchanged?)
            .ok_or_else(|| MetadataError::NoContentKey(file_id.to_string()))?;
        tracing::debug!(file_id, kid = %key.kid, "content key obtained");
        Ok(key)
    }
}
