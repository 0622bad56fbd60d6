//! Remote API locations and the web-player identity sent with every request.

use crate::http::HttpClient;

pub const CLIENT_VERSION: &str = "1.2.83.224.g3acda086";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";
pub const SECRETS_URL: &str =
    "https://code.thetadev.de/ThetaDev/spotify-secrets/raw/branch/main/secrets/secretDict.json";

/// Every URL the session, catalog and license code talk to. Templates use
/// `{id}` / `{file_id}` placeholders.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub server_time: String,
    pub session_token: String,
    pub client_token: String,
    pub metadata: String,
    pub track_playback: String,
    pub widevine_license: String,
    pub seek_table: String,
    pub storage_resolve: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            server_time: "https://open.spotify.com/api/server-time".to_string(),
            session_token: "https://open.spotify.com/api/token".to_string(),
            client_token: "https://clienttoken.spotify.com/v1/clienttoken".to_string(),
            metadata: "https://api-partner.spotify.com/pathfinder/v2/query".to_string(),
            track_playback:
                "https://gae2-spclient.spotify.com/track-playback/v1/media/spotify:track:{id}"
                    .to_string(),
            widevine_license:
                "https://gae2-spclient.spotify.com/widevine-license/v1/audio/license".to_string(),
            seek_table: "https://seektables.scdn.co/seektable/{file_id}.json".to_string(),
            storage_resolve: "https://gae2-spclient.spotify.com/storage-resolve/v2/files/audio/interactive/10/{file_id}?version=10000000&product=9&platform=39&alt=json".to_string(),
        }
    }
}

impl ApiEndpoints {
    /// All endpoints under one base URL (e.g. a local test server).
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            server_time: format!("{base}/api/server-time"),
            session_token: format!("{base}/api/token"),
            client_token: format!("{base}/v1/clienttoken"),
            metadata: format!("{base}/pathfinder/v2/query"),
            track_playback: format!("{base}/track-playback/v1/media/spotify:track:{{id}}"),
            widevine_license: format!("{base}/widevine-license/v1/audio/license"),
            seek_table: format!("{base}/seektable/{{file_id}}.json"),
            storage_resolve: format!("{base}/storage-resolve/{{file_id}}"),
        }
    }

    pub fn track_playback_url(&self, id: &str) -> String {
        self.track_playback.replace("{id}", id)
    }

    pub fn seek_table_url(&self, file_id: &str) -> String {
        self.seek_table.replace("{file_id}", file_id)
    }

    pub fn storage_resolve_url(&self, file_id: &str) -> String {
        self.storage_resolve.replace("{file_id}", file_id)
    }
}

/// HTTP client carrying the web-player headers and the `sp_dc` login cookie.
pub fn web_player_client(sp_dc: &str) -> HttpClient {
    HttpClient::new()
        .with_default_header("Accept", "*/*")
        .with_default_header("Origin", "https://open.spotify.com/")
        .with_default_header("Referer", "https://open.spotify.com/")
        .with_default_header("User-Agent", USER_AGENT)
        .with_default_header("Spotify-App-Version", CLIENT_VERSION)
        .with_default_header("App-Platform", "WebPlayer")
        .with_default_header("Cookie", format!("sp_dc={sp_dc}"))
}
