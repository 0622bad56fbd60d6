//! `votifast get` – download and decrypt everything behind a link.

use anyhow::{bail, Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use votifast_core::config::VotifastConfig;
use votifast_core::http::HttpClient;
use votifast_core::media_ref::MediaRef;
use votifast_core::pipeline::{Pipeline, PipelineEvent, PipelineOptions};
use votifast_core::worker::{DecryptWorker, DownloadWorker, FfmpegDecryptor};

use super::session::connect;
use crate::cli::SessionArgs;

pub async fn run_get(cfg: &VotifastConfig, session: &SessionArgs, url: &str) -> Result<()> {
    let media = MediaRef::parse(url)?;
    let catalog = connect(cfg, session).await?;

    let work_dir = cfg.resolved_work_dir();
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("creating work dir {}", work_dir.display()))?;

    let downloader = DownloadWorker::new(HttpClient::new()).with_timeout(cfg.download_timeout());
    let decryptor = DecryptWorker::new(
        catalog.clone(),
        Arc::new(FfmpegDecryptor::new(&cfg.decrypt_program)),
    );
    let options = PipelineOptions {
        download_workers: cfg.download_workers,
        decrypt_workers: cfg.decrypt_workers,
        output_dir: cfg.output_dir.clone(),
        work_dir,
        allow_premium: cfg.allow_premium && catalog.is_premium(),
    };

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let bytes = Arc::new(AtomicU64::new(0));
    let sink = {
        let bytes = Arc::clone(&bytes);
        Arc::new(move |n: u64| {
            bytes.fetch_add(n, Ordering::Relaxed);
        })
    };
    let pipeline = Pipeline::new(catalog, downloader, decryptor, options)
        .with_events(tx)
        .with_progress(sink);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match &event {
                PipelineEvent::DownloadFinished { track_id, bytes } => {
                    println!("downloaded {track_id} ({:.1} MiB)", *bytes as f64 / 1_048_576.0)
                }
                PipelineEvent::DownloadFailed { track_id, error } => {
                    println!("download failed {track_id}: {error}")
                }
                PipelineEvent::DecryptFinished { track_id } => println!("decrypted {track_id}"),
                other => tracing::debug!("{:?}", other),
            }
        }
    });

    println!("fetching {media}");
    let report = pipeline.run(&media).await?;
    drop(pipeline);
    let _ = printer.await;

    println!("{report}");
    println!(
        "{:.1} MiB transferred",
        bytes.load(Ordering::Relaxed) as f64 / 1_048_576.0
    );
    if report.has_failures() {
        bail!("{} item(s) failed", report.failed());
    }
    Ok(())
}
