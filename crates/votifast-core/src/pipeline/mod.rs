//! Batch orchestration: resolve → (download →) decrypt for every requested track.
//!
//! Each `run` builds its own pair of queues and pools. Items are resolved in
//! request order; downloads start as soon as they are enqueued. A per-item
//! task waits for that item's download, only then enqueues its decrypt job and
//! reports the item once the decrypt resolves, so within one item the decrypt
//! never precedes the download.
//!
//! Within a batch every source file is fetched once and every final path is
//! written once: a repeated file id is skipped, a repeated `<artist> - <title>`
//! gets a numbered name.
//!
//! Both queues are bounded, so metadata resolution runs at most a few items
//! ahead of the download workers.
//!
//! Shutdown order: download queue closed → download pool joined and drained →
//! all item tasks joined (every decrypt has been enqueued and resolved) →
//! decrypt queue closed → decrypt pool joined and drained.

mod events;
mod plan;
mod report;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;

use crate::error::MetadataError;
use crate::job::{DecryptJob, DownloadJob, ProgressSink};
use crate::media_ref::{MediaKind, MediaRef};
use crate::metadata::{AlbumTrack, MediaCatalog};
use crate::queue::JobQueue;
use crate::storage::ArtifactPaths;
use crate::worker::{DecryptWorker, DownloadWorker};

use events::EventSink;

pub use events::PipelineEvent;
pub use plan::{choose_cdn, is_slow_host, ResumePlan, SLOW_CDN_HOSTS};
pub use report::{BatchReport, ItemOutcome, ItemReport, SkipReason, Stage};

/// Pending jobs allowed per worker before resolving the next item waits.
const QUEUE_DEPTH_PER_WORKER: usize = 2;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub download_workers: usize,
    pub decrypt_workers: usize,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
    pub allow_premium: bool,
}

/// One track to fetch. `listing` carries album/playlist data when known.
#[derive(Debug, Clone)]
pub struct TrackRequest {
    pub track_id: String,
    pub listing: Option<AlbumTrack>,
}

impl TrackRequest {
    pub fn new(track_id: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            listing: None,
        }
    }
}

impl From<AlbumTrack> for TrackRequest {
    fn from(t: AlbumTrack) -> Self {
        Self {
            track_id: t.track_id.clone(),
            listing: Some(t),
        }
    }
}

pub struct Pipeline {
    catalog: Arc<dyn MediaCatalog>,
    downloader: DownloadWorker,
    decryptor: DecryptWorker,
    options: PipelineOptions,
    events: EventSink,
    progress: Option<ProgressSink>,
}

/// Resolved item ready for the job queues.
struct Prepared {
    index: usize,
    track_id: String,
    label: String,
    file_id: String,
    url: String,
    artist_line: String,
    title: String,
    paths: ArtifactPaths,
}

impl Prepared {
    /// Numbers the final name until it differs from every path already claimed.
    fn claim_final_path(&mut self, claimed: &mut HashSet<PathBuf>) {
        let mut n = 1;
        while !claimed.insert(self.paths.final_path.clone()) {
            n += 1;
            self.paths = self.paths.numbered(&self.artist_line, &self.title, n);
        }
        if n > 1 {
            tracing::debug!(track = %self.track_id, path = %self.paths.final_path.display(), "final name taken in this batch, numbered");
        }
    }
}

/// What an item task hands back to the batch.
struct ItemDone {
    index: usize,
    report: ItemReport,
    decrypt_enqueued: bool,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<dyn MediaCatalog>,
        downloader: DownloadWorker,
        decryptor: DecryptWorker,
        options: PipelineOptions,
    ) -> Self {
        Self {
            catalog,
            downloader,
            decryptor,
            options,
            events: EventSink::default(),
            progress: None,
        }
    }

    pub fn with_events(mut self, tx: UnboundedSender<PipelineEvent>) -> Self {
        self.events = EventSink::new(Some(tx));
        self
    }

    /// Called with the byte count of every downloaded chunk across the batch.
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Expands a link into its tracks and runs them as one batch.
    pub async fn run(&self, media: &MediaRef) -> Result<BatchReport, MetadataError> {
        let requests: Vec<TrackRequest> = match media.kind {
            MediaKind::Track => vec![TrackRequest::new(&media.id)],
            MediaKind::Album => {
                let album = self.catalog.get_album(&media.id).await?;
                tracing::info!(album = %album.name, tracks = album.tracks.len(), "album resolved");
                album.tracks.into_iter().map(TrackRequest::from).collect()
            }
            MediaKind::Playlist => {
                let tracks = self.catalog.get_playlist(&media.id).await?;
                tracing::info!(tracks = tracks.len(), "playlist resolved");
                tracks.into_iter().map(TrackRequest::from).collect()
            }
        };
        Ok(self.run_batch(requests).await)
    }

    /// Runs one batch to completion. Item failures are reported, never fatal.
    pub async fn run_batch(&self, requests: Vec<TrackRequest>) -> BatchReport {
        let downloads: JobQueue<DownloadJob> =
            JobQueue::bounded(self.options.download_workers.max(1) * QUEUE_DEPTH_PER_WORKER);
        let decrypts: JobQueue<DecryptJob> =
            JobQueue::bounded(self.options.decrypt_workers.max(1) * QUEUE_DEPTH_PER_WORKER);
        let download_pool = self
            .downloader
            .clone()
            .spawn_pool(self.options.download_workers, downloads.clone());
        let decrypt_pool = self
            .decryptor
            .clone()
            .spawn_pool(self.options.decrypt_workers, decrypts.clone());

        tracing::info!(items = requests.len(), "batch started");
        let mut report = BatchReport::default();
        let mut finished: Vec<(usize, ItemReport)> = Vec::new();
        let mut items: JoinSet<ItemDone> = JoinSet::new();
        let mut claimed_files: HashSet<String> = HashSet::new();
        let mut claimed_paths: HashSet<PathBuf> = HashSet::new();

        for (index, request) in requests.into_iter().enumerate() {
            let mut prepared = match self.prepare(index, request).await {
                Ok(p) => p,
                Err(item) => {
                    finished.push((index, item));
                    continue;
                }
            };

            if !claimed_files.insert(prepared.file_id.clone()) {
                tracing::debug!(track = %prepared.track_id, file_id = %prepared.file_id, "source already in this batch, skipping");
                finished.push((index, self.skipped(prepared, SkipReason::Duplicate)));
                continue;
            }
            prepared.claim_final_path(&mut claimed_paths);

            match ResumePlan::for_paths(&prepared.paths) {
                ResumePlan::Skip => {
                    tracing::debug!(track = %prepared.track_id, "final artifact present, skipping");
                    finished.push((index, self.skipped(prepared, SkipReason::AlreadyPresent)));
                }
                ResumePlan::DecryptOnly => {
                    tracing::debug!(track = %prepared.track_id, "interim artifact present, decrypt only");
                    let decrypts = decrypts.clone();
                    let events = self.events.clone();
                    items.spawn(async move { decrypt_stage(&decrypts, &events, prepared).await });
                }
                ResumePlan::DownloadThenDecrypt => {
                    let (mut job, completion) =
                        DownloadJob::new(prepared.url.clone(), prepared.paths.interim.clone());
                    if let Some(sink) = &self.progress {
                        job = job.with_progress(Arc::clone(sink));
                    }
                    if downloads.enqueue(job).await.is_err() {
                        finished.push((index, failed(&prepared, Stage::Download, "download queue closed")));
                        continue;
                    }
                    report.downloads_enqueued += 1;
                    self.events.emit(PipelineEvent::DownloadQueued {
                        track_id: prepared.track_id.clone(),
                    });

                    let decrypts = decrypts.clone();
                    let events = self.events.clone();
                    items.spawn(async move {
                        match completion.wait().await {
                            Ok(bytes) => {
                                events.emit(PipelineEvent::DownloadFinished {
                                    track_id: prepared.track_id.clone(),
                                    bytes,
                                });
                                decrypt_stage(&decrypts, &events, prepared).await
                            }
                            Err(e) => {
                                events.emit(PipelineEvent::DownloadFailed {
                                    track_id: prepared.track_id.clone(),
                                    error: e.to_string(),
                                });
                                ItemDone {
                                    index: prepared.index,
                                    report: failed(&prepared, Stage::Download, e.to_string()),
                                    decrypt_enqueued: false,
                                }
                            }
                        }
                    });
                }
            }
        }

        downloads.shutdown();
        download_pool.join().await;
        downloads.drain().await;

        while let Some(joined) = items.join_next().await {
            match joined {
                Ok(done) => {
                    if done.decrypt_enqueued {
                        report.decrypts_enqueued += 1;
                    }
                    finished.push((done.index, done.report));
                }
                Err(e) => tracing::error!("item task failed: {}", e),
            }
        }

        decrypts.shutdown();
        decrypt_pool.join().await;
        decrypts.drain().await;

        finished.sort_by_key(|(index, _)| *index);
        report.items = finished.into_iter().map(|(_, item)| item).collect();
        tracing::info!(
            completed = report.completed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "batch finished"
        );
        report
    }

    /// Metadata, source and CDN selection, artifact paths.
    async fn prepare(&self, index: usize, request: TrackRequest) -> Result<Prepared, ItemReport> {
        let track_id = request.track_id;
        let fallback_label = request
            .listing
            .as_ref()
            .map(|t| format!("{} - {}", t.stub.artist_line(), t.stub.name))
            .unwrap_or_else(|| track_id.clone());
        let resolve_failed = |message: String| ItemReport {
            track_id: track_id.clone(),
            label: fallback_label.clone(),
            outcome: ItemOutcome::Failed {
                stage: Stage::Resolve,
                message,
            },
        };

        if request.listing.as_ref().is_some_and(|t| !t.playable) {
            self.events.emit(PipelineEvent::Skipped {
                track_id: track_id.clone(),
            });
            return Err(ItemReport {
                track_id: track_id.clone(),
                label: fallback_label.clone(),
                outcome: ItemOutcome::Skipped(SkipReason::Unplayable),
            });
        }

        let track = match self.catalog.get_track(&track_id).await {
            Ok(Some(track)) => track,
            Ok(None) => return Err(resolve_failed("track is not available".to_string())),
            Err(e) => return Err(resolve_failed(e.to_string())),
        };
        let label = format!("{} - {}", track.stub.artist_line(), track.stub.name);

        let Some(source) = track.best_source(self.options.allow_premium) else {
            return Err(resolve_failed("no downloadable source".to_string()));
        };
        let Some(url) = choose_cdn(&source.cdns) else {
            return Err(resolve_failed(format!("no CDN URL for file {}", source.file_id)));
        };
        if is_slow_host(url) {
            tracing::debug!(track = %track_id, "only slow CDN hosts available");
        }

        let artist_line = track.stub.artist_line();
        let paths = ArtifactPaths::new(
            &self.options.work_dir,
            &self.options.output_dir,
            &source.file_id,
            &artist_line,
            &track.stub.name,
        );
        Ok(Prepared {
            index,
            track_id,
            label,
            file_id: source.file_id.clone(),
            url: url.to_string(),
            artist_line,
            title: track.stub.name.clone(),
            paths,
        })
    }

    fn skipped(&self, p: Prepared, reason: SkipReason) -> ItemReport {
        self.events.emit(PipelineEvent::Skipped {
            track_id: p.track_id.clone(),
        });
        ItemReport {
            track_id: p.track_id,
            label: p.label,
            outcome: ItemOutcome::Skipped(reason),
        }
    }
}

fn failed(p: &Prepared, stage: Stage, message: impl Into<String>) -> ItemReport {
    ItemReport {
        track_id: p.track_id.clone(),
        label: p.label.clone(),
        outcome: ItemOutcome::Failed {
            stage,
            message: message.into(),
        },
    }
}

/// Enqueues the item's decrypt and reports the item as soon as it resolves.
async fn decrypt_stage(queue: &JobQueue<DecryptJob>, events: &EventSink, p: Prepared) -> ItemDone {
    let (job, completion) = DecryptJob::new(
        p.file_id.clone(),
        p.paths.interim.clone(),
        p.paths.final_path.clone(),
    );
    if queue.enqueue(job).await.is_err() {
        return ItemDone {
            index: p.index,
            report: failed(&p, Stage::Decrypt, "decrypt queue closed"),
            decrypt_enqueued: false,
        };
    }
    events.emit(PipelineEvent::DecryptQueued {
        track_id: p.track_id.clone(),
    });

    let outcome = match completion.wait().await {
        Ok(()) => {
            events.emit(PipelineEvent::DecryptFinished {
                track_id: p.track_id.clone(),
            });
            ItemOutcome::Completed {
                path: p.paths.final_path,
            }
        }
        Err(e) => {
            events.emit(PipelineEvent::DecryptFailed {
                track_id: p.track_id.clone(),
                error: e.to_string(),
            });
            ItemOutcome::Failed {
                stage: Stage::Decrypt,
                message: e.to_string(),
            }
        }
    };
    ItemDone {
        index: p.index,
        report: ItemReport {
            track_id: p.track_id,
            label: p.label,
            outcome,
        },
        decrypt_enqueued: true,
    }
}
