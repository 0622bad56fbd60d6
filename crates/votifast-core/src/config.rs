use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::endpoints::SECRETS_URL;

/// Remote CDM used for the license exchange (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdmConfig {
    /// Base URL of a pywidevine-compatible remote CDM API.
    pub host: String,
    /// Device name registered on that server.
    pub device: String,
    /// Sent as `X-Secret-Key`.
    pub secret: String,
}

impl Default for CdmConfig {
    fn default() -> Self {
        Self {
            host: "https://cdrm-project.com/remotecdm/widevine".to_string(),
            device: "public".to_string(),
            secret: "CDRM".to_string(),
        }
    }
}

/// Global configuration loaded from `~/.config/votifast/config.toml`.
/// Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotifastConfig {
    /// Concurrent download workers.
    pub download_workers: usize,
    /// Concurrent decrypt workers.
    pub decrypt_workers: usize,
    /// Where decrypted `.m4a` files are written.
    pub output_dir: PathBuf,
    /// Where encrypted interim files are kept until decrypted.
    /// Defaults to `<output_dir>/.votifast`.
    pub work_dir: Option<PathBuf>,
    /// Seconds before expiry at which the session credential counts as expired.
    pub credential_margin_secs: u64,
    /// Overall per-download timeout; no limit when absent.
    pub download_timeout_secs: Option<u64>,
    /// Use PREMIUM-tier sources when the account has them.
    pub allow_premium: bool,
    /// Program invoked to decrypt (ffmpeg-compatible arguments).
    pub decrypt_program: String,
    /// Published one-time-code secrets.
    pub secrets_url: String,
    /// `sp_dc` login cookie. Can also be given on the command line.
    pub sp_dc: Option<String>,
    pub cdm: CdmConfig,
}

impl Default for VotifastConfig {
    fn default() -> Self {
        Self {
            download_workers: 10,
            decrypt_workers: 1,
            output_dir: PathBuf::from("."),
            work_dir: None,
            credential_margin_secs: 0,
            download_timeout_secs: None,
            allow_premium: false,
            decrypt_program: "ffmpeg".to_string(),
            secrets_url: SECRETS_URL.to_string(),
            sp_dc: None,
            cdm: CdmConfig::default(),
        }
    }
}

impl VotifastConfig {
    pub fn resolved_work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join(".votifast"))
    }

    pub fn download_timeout(&self) -> Option<Duration> {
        self.download_timeout_secs.map(Duration::from_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("votifast")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VotifastConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<VotifastConfig> {
    if !path.exists() {
        let default_cfg = VotifastConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, toml).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: VotifastConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = VotifastConfig::default();
        assert_eq!(cfg.download_workers, 10);
        assert_eq!(cfg.decrypt_workers, 1);
        assert_eq!(cfg.credential_margin_secs, 0);
        assert!(cfg.download_timeout().is_none());
        assert_eq!(cfg.resolved_work_dir(), PathBuf::from("./.votifast"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = VotifastConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: VotifastConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_values() {
        let toml = r#"
            download_workers = 4
            output_dir = "/music"
            download_timeout_secs = 600

            [cdm]
            host = "http://localhost:8080"
        "#;
        let cfg: VotifastConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.download_workers, 4);
        assert_eq!(cfg.decrypt_workers, 1);
        assert_eq!(cfg.resolved_work_dir(), PathBuf::from("/music/.votifast"));
        assert_eq!(cfg.download_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(cfg.cdm.host, "http://localhost:8080");
        assert_eq!(cfg.cdm.device, "public");
        assert!(cfg.sp_dc.is_none());
    }

    #[test]
    fn load_or_init_writes_defaults_then_reads_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let first = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        let second = load_or_init_at(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "download_workers = \"many\"").unwrap();
        let err = load_or_init_at(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }
}
