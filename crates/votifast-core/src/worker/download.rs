//! Download worker: stream one URL to disk, report the byte count.

use std::path::Path;
use std::time::Duration;

use crate::error::DownloadError;
use crate::http::{HttpClient, HttpError};
use crate::job::{DownloadJob, ProgressSink};
use crate::queue::JobQueue;
use crate::storage::{temp_path, StorageWriterBuilder};

use super::WorkerPool;

/// Runs download jobs. Not retried: a failure is reported once on the job's
/// completion signal and leaves neither the `.part` nor the destination behind.
#[derive(Clone)]
pub struct DownloadWorker {
    http: HttpClient,
    timeout: Option<Duration>,
}

impl DownloadWorker {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            timeout: None,
        }
    }

    /// Overall per-transfer timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// `size` workers draining `queue`.
    pub fn spawn_pool(self, size: usize, queue: JobQueue<DownloadJob>) -> WorkerPool {
        WorkerPool::spawn("download", size, queue, move |job| {
            let worker = self.clone();
            async move { worker.run(job).await }
        })
    }

    pub async fn run(&self, job: DownloadJob) {
        let DownloadJob {
            url,
            output,
            progress,
            completer,
        } = job;
        tracing::debug!(url = %url, output = %output.display(), "download started");

        let http = self.http.clone();
        let timeout = self.timeout;
        let result = {
            let output = output.clone();
            tokio::task::spawn_blocking(move || fetch_to(&http, &url, &output, timeout, progress))
                .await
                .unwrap_or_else(|e| Err(DownloadError::Transfer(format!("download task: {e}"))))
        };

        match &result {
            Ok(bytes) => tracing::debug!(bytes, output = %output.display(), "download finished"),
            Err(e) => tracing::warn!(output = %output.display(), "download failed: {}", e),
        }
        completer.complete(result);
    }
}

/// Blocking transfer into `<output>.part`, renamed to `output` on success.
fn fetch_to(
    http: &HttpClient,
    url: &str,
    output: &Path,
    timeout: Option<Duration>,
    progress: Option<ProgressSink>,
) -> Result<u64, DownloadError> {
    let tmp = temp_path(output);
    let writer = StorageWriterBuilder::create(&tmp)
        .map_err(|e| DownloadError::Storage(format!("{e:#}")))?
        .build();

    let mut written = 0u64;
    let mut write_err = None;
    let outcome = http.stream_to(url, timeout, |chunk| {
        match writer.write_at(written, chunk) {
            Ok(()) => {
                let n = chunk.len() as u64;
                written += n;
                if let Some(sink) = &progress {
                    sink(n);
                }
                true
            }
            Err(e) => {
                write_err = Some(e);
                false
            }
        }
    });

    let checked = match (outcome, write_err) {
        (_, Some(e)) => Err(DownloadError::Storage(format!("{e:#}"))),
        (Err(HttpError::Status(status)), None) => Err(DownloadError::Status(status)),
        (Err(e), None) => Err(DownloadError::Transfer(e.to_string())),
        (Ok(status), None) if !(200..300).contains(&status) => Err(DownloadError::Status(status)),
        (Ok(_), None) => Ok(()),
    };

    if let Err(e) = checked.and_then(|()| {
        writer
            .sync()
            .map_err(|e| DownloadError::Storage(format!("{e:#}")))
    }) {
        writer.discard();
        return Err(e);
    }
    if let Err(e) = writer.finalize(output) {
        let _ = std::fs::remove_file(&tmp);
        return Err(DownloadError::Storage(format!("{e:#}")));
    }
    Ok(written)
}
