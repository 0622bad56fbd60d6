//! Outstanding-job accounting and the RAII handle that releases one job.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

#[derive(Default)]
pub(super) struct Outstanding {
    count: Mutex<usize>,
    idle: Notify,
}

impl Outstanding {
    pub(super) fn increment(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_waiters();
        }
    }

    pub(super) fn get(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.get() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Acknowledges one delivered job exactly once: explicitly via
/// [`Ack::acknowledge`] or implicitly when dropped.
#[must_use = "dropping an Ack acknowledges the job immediately"]
pub struct Ack {
    outstanding: Arc<Outstanding>,
}

impl Ack {
    pub(super) fn new(outstanding: Arc<Outstanding>) -> Self {
        Self { outstanding }
    }

    pub fn acknowledge(self) {
        drop(self);
    }
}

impl Drop for Ack {
    fn drop(&mut self) {
        self.outstanding.decrement();
    }
}

impl std::fmt::Debug for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Ack")
    }
}
