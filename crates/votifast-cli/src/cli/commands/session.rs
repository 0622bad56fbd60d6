//! Builds the authenticated catalog from config and command-line options.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use votifast_core::config::VotifastConfig;
use votifast_core::endpoints::{self, ApiEndpoints};
use votifast_core::http::{HttpClient, HttpRequest};
use votifast_core::license::RemoteCdm;
use votifast_core::metadata::MetadataClient;
use votifast_core::otp::Totp;
use votifast_core::session::{SessionManager, SystemClock};

use crate::cli::SessionArgs;

/// Downloads the published one-time-code secrets and picks the newest version.
async fn fetch_totp(url: &str) -> Result<Totp> {
    let response = HttpClient::new()
        .send(HttpRequest::get(url))
        .await
        .with_context(|| format!("fetching secrets from {url}"))?;
    if !response.is_success() {
        bail!("fetching secrets from {url}: HTTP {}", response.status);
    }
    let secrets: BTreeMap<String, Vec<u8>> = response.json().context("parsing secrets")?;
    Totp::from_secrets(&secrets).context("secrets file has no usable version")
}

/// Session + catalog, authenticated and with the account tier loaded.
pub async fn connect(cfg: &VotifastConfig, args: &SessionArgs) -> Result<Arc<MetadataClient>> {
    let Some(sp_dc) = args.sp_dc.as_deref().or(cfg.sp_dc.as_deref()) else {
        bail!("no sp_dc cookie: pass --sp-dc or set sp_dc in the config file");
    };

    let totp = fetch_totp(&cfg.secrets_url).await?;
    let session = SessionManager::with_clock(
        endpoints::web_player_client(sp_dc),
        ApiEndpoints::default(),
        Arc::new(totp),
        Arc::new(SystemClock),
        cfg.credential_margin_secs,
    );
    let cdm = RemoteCdm::new(&cfg.cdm.host, &cfg.cdm.device, &cfg.cdm.secret);
    let client = MetadataClient::new(session, Arc::new(cdm));
    let premium = client.initialize().await.context("logging in")?;
    tracing::info!(premium, "connected");
    Ok(Arc::new(client))
}
