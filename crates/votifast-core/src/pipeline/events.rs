//! Progress notifications emitted while a batch runs.

use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    DownloadQueued { track_id: String },
    DownloadFinished { track_id: String, bytes: u64 },
    DownloadFailed { track_id: String, error: String },
    DecryptQueued { track_id: String },
    DecryptFinished { track_id: String },
    DecryptFailed { track_id: String, error: String },
    Skipped { track_id: String },
}

impl PipelineEvent {
    pub fn track_id(&self) -> &str {
        match self {
            PipelineEvent::DownloadQueued { track_id }
            | PipelineEvent::DownloadFinished { track_id, .. }
            | PipelineEvent::DownloadFailed { track_id, .. }
            | PipelineEvent::DecryptQueued { track_id }
            | PipelineEvent::DecryptFinished { track_id }
            | PipelineEvent::DecryptFailed { track_id, .. }
            | PipelineEvent::Skipped { track_id } => track_id,
        }
    }
}

/// Optional sender; events are dropped when nobody listens.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink(Option<UnboundedSender<PipelineEvent>>);

impl EventSink {
    pub(crate) fn new(tx: Option<UnboundedSender<PipelineEvent>>) -> Self {
        Self(tx)
    }

    pub(crate) fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(event);
        }
    }
}
