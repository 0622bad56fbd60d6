//! Ordered, shutdown-aware work queue shared by a pool of workers.
//!
//! One `JobQueue<T>` handle is cloned into every worker and the producer.
//! `dequeue` suspends on a `Notify` rather than polling. A queue built with
//! [`JobQueue::bounded`] holds at most `capacity` pending jobs: `enqueue`
//! suspends while it is full and fails if the queue is shut down meanwhile.
//! [`JobQueue::new`] never makes producers wait. Each delivered job
//! comes with an [`Ack`]; the outstanding count drops when the ack is consumed
//! or dropped, so a worker that panics mid-job still releases `drain()`.

mod ack;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::error::QueueClosed;

pub use ack::Ack;
use ack::Outstanding;

struct State<T> {
    pending: VecDeque<T>,
    closed: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    capacity: Option<usize>,
    available: Notify,
    space: Notify,
    outstanding: Arc<Outstanding>,
}

pub struct JobQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for JobQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JobQueue<T> {
    /// Unbounded queue.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Queue holding at most `capacity` pending jobs (at least one).
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity.max(1)))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    pending: VecDeque::new(),
                    closed: false,
                }),
                capacity,
                available: Notify::new(),
                space: Notify::new(),
                outstanding: Arc::new(Outstanding::default()),
            }),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.shared.capacity
    }

    fn state(&self) -> MutexGuard<'_, State<T>> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a job, waiting for room while a bounded queue is full. Fails
    /// once the queue has been shut down.
    pub async fn enqueue(&self, job: T) -> Result<(), QueueClosed> {
        loop {
            let notified = self.shared.space.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state();
                if state.closed {
                    return Err(QueueClosed);
                }
                let has_room = match self.shared.capacity {
                    Some(cap) => state.pending.len() < cap,
                    None => true,
                };
                if has_room {
                    state.pending.push_back(job);
                    self.shared.outstanding.increment();
                    break;
                }
            }
            notified.await;
        }
        self.shared.available.notify_one();
        Ok(())
    }

    /// Next job in FIFO order, or `None` once the queue is shut down and empty.
    pub async fn dequeue(&self) -> Option<(T, Ack)> {
        loop {
            let notified = self.shared.available.notified();
            tokio::pin!(notified);
            // Register before inspecting state so a concurrent enqueue/shutdown
            // between the check and the await is not missed.
            notified.as_mut().enable();
            {
                let mut state = self.state();
                if let Some(job) = state.pending.pop_front() {
                    if !state.pending.is_empty() {
                        // Pass the wakeup on; notify_one permits do not stack.
                        self.shared.available.notify_one();
                    }
                    drop(state);
                    self.shared.space.notify_waiters();
                    return Some((job, Ack::new(Arc::clone(&self.shared.outstanding))));
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Stops accepting jobs and wakes every idle worker. Already queued jobs
    /// are still handed out. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.state();
        if !state.closed {
            tracing::debug!(pending = state.pending.len(), "queue shut down");
        }
        state.closed = true;
        drop(state);
        self.shared.available.notify_waiters();
        self.shared.space.notify_waiters();
    }

    /// Waits until every enqueued job has been acknowledged.
    pub async fn drain(&self) {
        self.shared.outstanding.wait_idle().await;
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Jobs waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Jobs enqueued and not yet acknowledged.
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.get()
    }
}
