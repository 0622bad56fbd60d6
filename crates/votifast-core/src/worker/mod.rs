//! Fixed-size pools of tasks pulling jobs from one [`JobQueue`].
//!
//! A worker loops `dequeue → handle → acknowledge` until the queue reports it
//! is closed and empty. Handlers report job failures through the job's own
//! completion signal; a panicking handler is caught and logged so the worker
//! keeps serving the queue.

pub mod decrypt;
pub mod download;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;

use crate::queue::JobQueue;

pub use decrypt::{DecryptTool, DecryptWorker, FfmpegDecryptor};
pub use download::DownloadWorker;

pub struct WorkerPool {
    name: &'static str,
    tasks: JoinSet<()>,
}

impl WorkerPool {
    /// Spawns `size` workers (at least one) on the current runtime.
    pub fn spawn<T, F, Fut>(name: &'static str, size: usize, queue: JobQueue<T>, handler: F) -> Self
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let size = size.max(1);
        let handler = Arc::new(handler);
        let mut tasks = JoinSet::new();
        for worker in 0..size {
            let queue = queue.clone();
            let handler = Arc::clone(&handler);
            tasks.spawn(async move {
                while let Some((job, ack)) = queue.dequeue().await {
                    if AssertUnwindSafe(handler(job)).catch_unwind().await.is_err() {
                        tracing::error!(pool = name, worker, "job handler panicked");
                    }
                    ack.acknowledge();
                }
                tracing::debug!(pool = name, worker, "worker stopped: queue closed");
            });
        }
        tracing::debug!(pool = name, size, "worker pool started");
        WorkerPool { name, tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every worker to exit. Workers exit only once their queue
    /// has been shut down, so call `JobQueue::shutdown` first.
    pub async fn join(mut self) {
        while let Some(res) = self.tasks.join_next().await {
            if let Err(e) = res {
                tracing::error!(pool = self.name, "worker task failed: {}", e);
            }
        }
        tracing::debug!(pool = self.name, "worker pool joined");
    }
}
