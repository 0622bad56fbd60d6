//! The two job kinds and the completion signal that carries their outcome.
//!
//! A [`Completer`] is moved along with the job into the worker that runs it
//! and is consumed by `complete`. Any number of [`Completion`] handles may
//! wait on it. If the completer is dropped without being fulfilled (worker
//! panicked, job discarded by a closed queue), waiters see the error type's
//! "abandoned" variant instead of hanging.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{AbandonedError, DecryptionError, DownloadError};

/// Per-chunk progress callback; receives the byte count of each chunk.
pub type ProgressSink = Arc<dyn Fn(u64) + Send + Sync>;

/// Write side of a single-assignment result cell.
pub struct Completer<T, E> {
    tx: watch::Sender<Option<Result<T, E>>>,
}

/// Read side; cloneable, every clone observes the same result.
pub struct Completion<T, E> {
    rx: watch::Receiver<Option<Result<T, E>>>,
}

impl<T, E> Clone for Completion<T, E> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

pub fn completion_pair<T, E>() -> (Completer<T, E>, Completion<T, E>) {
    let (tx, rx) = watch::channel(None);
    (Completer { tx }, Completion { rx })
}

impl<T, E> Completer<T, E> {
    /// Fulfils the signal. Consuming `self` makes a second fulfilment impossible.
    pub fn complete(self, result: Result<T, E>) {
        // send_replace stores the value even if every observer is gone.
        self.tx.send_replace(Some(result));
    }
}

impl<T: Clone, E: Clone + AbandonedError> Completion<T, E> {
    /// Waits for the outcome.
    pub async fn wait(&self) -> Result<T, E> {
        let mut rx = self.rx.clone();
        // The guard borrows `rx`; clone the outcome out before it is dropped.
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.as_ref().cloned(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| Err(E::abandoned()))
    }

    /// The outcome if it is already known.
    pub fn peek(&self) -> Option<Result<T, E>> {
        self.rx.borrow().clone()
    }
}

/// Fetch `url` into `output`; completes with the number of bytes written.
pub struct DownloadJob {
    pub url: String,
    pub output: PathBuf,
    pub progress: Option<ProgressSink>,
    pub completer: Completer<u64, DownloadError>,
}

impl DownloadJob {
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> (Self, DownloadCompletion) {
        let (completer, completion) = completion_pair();
        let job = Self {
            url: url.into(),
            output: output.into(),
            progress: None,
            completer,
        };
        (job, completion)
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }
}

impl fmt::Debug for DownloadJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadJob")
            .field("url", &self.url)
            .field("output", &self.output)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Decrypt `input` into `output` with the key for `file_id`; `input` is
/// removed only when this succeeds.
pub struct DecryptJob {
    pub file_id: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub completer: Completer<(), DecryptionError>,
}

impl DecryptJob {
    pub fn new(
        file_id: impl Into<String>,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> (Self, DecryptCompletion) {
        let (completer, completion) = completion_pair();
        let job = Self {
            file_id: file_id.into(),
            input: input.into(),
            output: output.into(),
            completer,
        };
        (job, completion)
    }
}

impl fmt::Debug for DecryptJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptJob")
            .field("file_id", &self.file_id)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

pub type DownloadCompletion = Completion<u64, DownloadError>;
pub type DecryptCompletion = Completion<(), DecryptionError>;
