//! Per-item decisions made before any job is enqueued.

use crate::storage::ArtifactPaths;

/// CDN hosts that only speak HTTP/1.1 and are markedly slower.
pub const SLOW_CDN_HOSTS: [&str; 2] = ["audio-ak.spotifycdn.com", "audio-fa.scdn.co"];

pub fn is_slow_host(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| SLOW_CDN_HOSTS.contains(&h)))
        .unwrap_or(false)
}

/// First URL not on a slow host; a slow one only when nothing else exists.
pub fn choose_cdn(cdns: &[String]) -> Option<&str> {
    cdns.iter()
        .find(|u| !is_slow_host(u))
        .or_else(|| cdns.first())
        .map(String::as_str)
}

/// What an item still needs, judged from the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePlan {
    /// Final artifact present.
    Skip,
    /// Interim present, final missing.
    DecryptOnly,
    DownloadThenDecrypt,
}

impl ResumePlan {
    pub fn decide(interim_exists: bool, final_exists: bool) -> Self {
        match (interim_exists, final_exists) {
            (_, true) => ResumePlan::Skip,
            (true, false) => ResumePlan::DecryptOnly,
            (false, false) => ResumePlan::DownloadThenDecrypt,
        }
    }

    pub fn for_paths(paths: &ArtifactPaths) -> Self {
        Self::decide(paths.interim_exists(), paths.final_exists())
    }
}
